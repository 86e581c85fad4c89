use crate::signal::RPeaks;
use serde::{Deserialize, Serialize};

/// Tunable surface of the R-peak detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Lower cutoff of the QRS band (Hz).
    pub bandpass_low_hz: f64,
    /// Upper cutoff of the QRS band (Hz).
    pub bandpass_high_hz: f64,
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Refractory period between accepted beats (seconds).
    pub refractory_s: f64,
    /// Scale between noise and signal envelopes for the adaptive threshold.
    pub threshold_scale: f64,
    /// How far back to search (seconds) for the precise R-peak after a detection.
    pub search_back_s: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            bandpass_low_hz: 5.0,
            bandpass_high_hz: 15.0,
            integration_window_s: 0.150,
            refractory_s: 0.150,
            threshold_scale: 0.6,
            search_back_s: 0.150,
        }
    }
}

/// Pan–Tompkins-style beat detection over one ECG segment.
///
/// Bandpass, slope energy, moving window integration, then an adaptive
/// two-level threshold with search-back into the bandpassed signal.
pub fn detect_r_peaks(samples: &[f64], fs: f64, cfg: &DetectorConfig) -> RPeaks {
    if samples.is_empty() || fs <= 0.0 {
        return RPeaks::from_indices(Vec::new());
    }

    let bandpassed = bandpass(samples, fs, cfg.bandpass_low_hz, cfg.bandpass_high_hz);
    let energy = slope_energy(&bandpassed);
    let win = ((cfg.integration_window_s * fs).round() as usize).max(1);
    let envelope = moving_average(&energy, win);
    let peaks = threshold_peaks(&bandpassed, &envelope, fs, cfg);

    if peaks.len() < 2 {
        // The adaptive method underperformed; fall back to a naive picker.
        return RPeaks::from_indices(local_maxima_picker(samples, fs, cfg.refractory_s));
    }

    RPeaks::from_indices(peaks)
}

fn bandpass(data: &[f64], fs: f64, low: f64, high: f64) -> Vec<f64> {
    let hp = if low > 0.0 {
        single_pole_highpass(data, fs, low)
    } else {
        data.to_vec()
    };
    if high <= 0.0 || high >= fs * 0.5 {
        hp
    } else {
        single_pole_lowpass(&hp, fs, high)
    }
}

fn single_pole_highpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev_y = *data.first().unwrap_or(&0.0);
    let mut prev_x = prev_y;
    for &x in data {
        let y = alpha * (prev_y + x - prev_x);
        out.push(y);
        prev_y = y;
        prev_x = x;
    }
    out
}

fn single_pole_lowpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = *data.first().unwrap_or(&0.0);
    for &x in data {
        prev = prev + alpha * (x - prev);
        out.push(prev);
    }
    out
}

/// Squared first difference, emphasizing the steep QRS slopes.
fn slope_energy(data: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        let d = data[i] - data[i - 1];
        out[i] = d * d;
    }
    out
}

fn moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if win <= 1 {
        return data.to_vec();
    }
    let mut out = vec![0.0; data.len()];
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= win {
            acc -= data[i - win];
        }
        out[i] = acc / win as f64;
    }
    out
}

/// Running signal/noise envelopes with the classic 1/8 update weight.
struct AdaptiveThreshold {
    signal_level: f64,
    noise_level: f64,
    scale: f64,
}

impl AdaptiveThreshold {
    fn seeded(envelope: &[f64], fs: f64, scale: f64) -> Self {
        let init = envelope.len().min((fs as usize).max(1));
        let avg = if init > 0 {
            envelope[..init].iter().sum::<f64>() / init as f64
        } else {
            0.0
        };
        Self {
            signal_level: avg,
            noise_level: avg * 0.5,
            scale,
        }
    }

    fn value(&self) -> f64 {
        self.noise_level + self.scale * (self.signal_level - self.noise_level).max(0.0)
    }

    fn accept(&mut self, sample: f64) {
        self.signal_level = 0.125 * sample + 0.875 * self.signal_level;
    }

    fn reject(&mut self, sample: f64) {
        self.noise_level = 0.125 * sample + 0.875 * self.noise_level;
    }
}

fn threshold_peaks(bandpassed: &[f64], envelope: &[f64], fs: f64, cfg: &DetectorConfig) -> Vec<usize> {
    if bandpassed.is_empty() || envelope.is_empty() {
        return Vec::new();
    }

    let refractory = ((cfg.refractory_s * fs).round() as usize).max(1);
    let search = ((cfg.search_back_s * fs).round() as usize).max(1);
    let mut threshold = AdaptiveThreshold::seeded(envelope, fs, cfg.threshold_scale);

    let mut peaks: Vec<usize> = Vec::new();
    let mut last_trigger = 0usize;
    for (i, &sample) in envelope.iter().enumerate() {
        let refractory_ok = peaks.is_empty() || i - last_trigger >= refractory;
        // A silent segment has zero slope energy everywhere; never trigger on it.
        if sample > 0.0 && sample >= threshold.value() && refractory_ok {
            peaks.push(search_back_max(bandpassed, i, search));
            last_trigger = i;
            threshold.accept(sample);
        } else {
            threshold.reject(sample);
        }
    }

    peaks.sort_unstable();
    peaks.dedup();
    peaks
}

/// Index of the bandpassed maximum within `search` samples before `trigger`.
fn search_back_max(bandpassed: &[f64], trigger: usize, search: usize) -> usize {
    let start = trigger.saturating_sub(search);
    let end = trigger.min(bandpassed.len() - 1);
    let mut idx = start;
    let mut max_val = f64::MIN;
    for (j, &v) in bandpassed.iter().enumerate().take(end + 1).skip(start) {
        if v > max_val {
            max_val = v;
            idx = j;
        }
    }
    idx
}

fn local_maxima_picker(data: &[f64], fs: f64, refractory_s: f64) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let min_gap = ((refractory_s * fs).max(1.0)) as usize;
    let baseline = moving_average(data, ((0.150 * fs) as usize).max(1));

    let mut peaks = Vec::new();
    let mut last_idx = 0usize;
    for i in 1..data.len() - 1 {
        let y = data[i] - baseline[i];
        let prev = data[i - 1] - baseline[i - 1];
        let next = data[i + 1] - baseline[i + 1];
        if y > 0.0 && y > prev && y > next && (peaks.is_empty() || i - last_idx >= min_gap) {
            peaks.push(i);
            last_idx = i;
        }
    }
    peaks
}
