use crate::signal::rr_to_millis;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// RMSSD values above this (milliseconds) are logged as anomalous.
pub const RMSSD_ANOMALY_MS: f64 = 200.0;

/// Minimum number of filtered intervals required to report metrics.
pub const DEFAULT_MIN_RR_COUNT: usize = 6;

/// Per-epoch heart-rate / HRV outcome. "Insufficient" is a value, not an
/// error: it flows through alignment and is serialized as the -1 sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EpochMetrics {
    Metrics { heart_rate: f64, rmssd: f64 },
    Insufficient,
}

impl EpochMetrics {
    /// Heart rate in bpm, or the -1 sentinel.
    pub fn heart_rate(&self) -> f64 {
        match self {
            EpochMetrics::Metrics { heart_rate, .. } => *heart_rate,
            EpochMetrics::Insufficient => -1.0,
        }
    }

    /// RMSSD in milliseconds, or the -1 sentinel.
    pub fn rmssd(&self) -> f64 {
        match self {
            EpochMetrics::Metrics { rmssd, .. } => *rmssd,
            EpochMetrics::Insufficient => -1.0,
        }
    }
}

/// Reduce one segment's filtered R-R sequence (seconds) to heart rate and
/// RMSSD, both rounded to 2 decimal places.
pub fn aggregate(filtered_rr_seconds: &[f64], min_rr_count: usize) -> EpochMetrics {
    if filtered_rr_seconds.len() < min_rr_count {
        return EpochMetrics::Insufficient;
    }

    let mean = filtered_rr_seconds.iter().sum::<f64>() / filtered_rr_seconds.len() as f64;
    let heart_rate = round2(60.0 / mean);

    let rr_ms = rr_to_millis(filtered_rr_seconds);
    let rmssd = round2(rmssd_ms(&rr_ms));
    if rmssd > RMSSD_ANOMALY_MS {
        warn!("anomalous RMSSD {rmssd} ms over {} intervals", rr_ms.len());
    }
    debug!(
        "epoch metrics: hr={heart_rate:.2} bpm rmssd={rmssd:.2} ms n={}",
        filtered_rr_seconds.len()
    );

    EpochMetrics::Metrics { heart_rate, rmssd }
}

/// Root mean square of successive differences, over millisecond intervals.
pub fn rmssd_ms(rr_ms: &[f64]) -> f64 {
    if rr_ms.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = rr_ms.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    (sum_sq / (rr_ms.len() - 1) as f64).sqrt()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
