//! R-R interval cleaning: a hard physiological range clamp followed by
//! iterative local-median relative-change filtering.

/// Shortest plausible R-R interval (seconds).
pub const RR_MIN_S: f64 = 0.5;
/// Longest plausible R-R interval (seconds).
pub const RR_MAX_S: f64 = 1.4;
/// Default bound on the relative change between neighbouring intervals.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.2;

/// Drop intervals outside the physiological range.
pub fn clamp_physiological(rr_seconds: &[f64]) -> Vec<f64> {
    rr_seconds
        .iter()
        .copied()
        .filter(|rr| (RR_MIN_S..=RR_MAX_S).contains(rr))
        .collect()
}

/// Full cleaning pass: range clamp, then relative-change filtering to a
/// fixed point.
///
/// The output is always an order-preserving subsequence of the input. Each
/// filtering round either removes at least one interval or stops, so the
/// loop terminates after at most `n` rounds.
pub fn clean_rr(rr_seconds: &[f64], change_threshold: f64) -> Vec<f64> {
    let mut rr = clamp_physiological(rr_seconds);
    loop {
        // Too few intervals to say anything about local change.
        if rr.len() < 3 {
            break;
        }
        let filtered = filter_round(&rr, change_threshold);
        if filtered.len() == rr.len() {
            break;
        }
        rr = filtered;
    }
    rr
}

/// One round of relative-change filtering.
///
/// Every interval except the first is compared against its immediate
/// predecessor; the first has no predecessor and is compared against the
/// sequence median instead.
fn filter_round(rr: &[f64], change_threshold: f64) -> Vec<f64> {
    let med = median(rr);
    rr.iter()
        .enumerate()
        .filter(|&(i, &x)| {
            let reference = if i == 0 { med } else { rr[i - 1] };
            relative_change(x, reference) <= change_threshold
        })
        .map(|(_, &x)| x)
        .collect()
}

fn relative_change(value: f64, reference: f64) -> f64 {
    (value - reference).abs() / reference
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_drops_out_of_range_intervals() {
        let rr = [0.3, 0.8, 1.6, 0.5, 1.4, 0.49];
        assert_eq!(clamp_physiological(&rr), vec![0.8, 0.5, 1.4]);
    }

    #[test]
    fn ectopic_interval_is_removed() {
        let rr = [0.8, 0.81, 0.79, 1.3, 0.8, 0.82, 0.8];
        let cleaned = clean_rr(&rr, DEFAULT_CHANGE_THRESHOLD);
        assert!(!cleaned.contains(&1.3));
        assert!(cleaned.len() < rr.len());
    }

    #[test]
    fn output_is_an_order_preserving_subsequence() {
        let rr = [0.7, 1.35, 0.72, 0.74, 0.52, 0.73, 0.71, 1.1, 0.7];
        let cleaned = clean_rr(&rr, DEFAULT_CHANGE_THRESHOLD);
        assert!(cleaned.len() <= rr.len());
        // Every output element must appear in the input, in order.
        let mut cursor = 0;
        for value in &cleaned {
            let pos = rr[cursor..]
                .iter()
                .position(|x| x == value)
                .expect("output value missing from input");
            cursor += pos + 1;
        }
    }

    #[test]
    fn idempotent_at_fixed_point() {
        let rr = [0.8, 0.81, 0.79, 1.3, 0.8, 0.82, 0.8, 0.78, 0.84];
        let once = clean_rr(&rr, DEFAULT_CHANGE_THRESHOLD);
        let twice = clean_rr(&once, DEFAULT_CHANGE_THRESHOLD);
        assert_eq!(once, twice);
    }

    #[test]
    fn short_sequences_pass_through_after_clamp() {
        let rr = [0.8, 0.82];
        assert_eq!(clean_rr(&rr, DEFAULT_CHANGE_THRESHOLD), vec![0.8, 0.82]);
    }
}
