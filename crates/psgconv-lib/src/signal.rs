use serde::{Deserialize, Serialize};

/// One channel of a polysomnography recording, immutable once read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgTrace {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl EcgTrace {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }

    /// Samples per segment for a fixed segment duration.
    pub fn segment_samples(&self, segment_s: f64) -> usize {
        (segment_s * self.fs) as usize
    }

    /// Number of whole segments; trailing remainder samples are dropped.
    pub fn segment_count(&self, segment_s: f64) -> usize {
        let samples = self.segment_samples(segment_s);
        if samples == 0 {
            return 0;
        }
        self.data.len() / samples
    }

    /// Borrow the samples of segment `index`.
    pub fn segment(&self, index: usize, segment_s: f64) -> &[f64] {
        let samples = self.segment_samples(segment_s);
        let start = index * samples;
        &self.data[start..start + samples]
    }
}

/// Detected R-peak positions, as sample indices into one segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RPeaks {
    pub indices: Vec<usize>,
}

impl RPeaks {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Successive peak distances divided by the sampling rate (seconds).
    pub fn rr_seconds(&self, fs: f64) -> Vec<f64> {
        self.indices
            .windows(2)
            .map(|w| (w[1] - w[0]) as f64 / fs)
            .collect()
    }
}

/// Seconds to milliseconds for a whole R-R sequence.
pub fn rr_to_millis(rr_seconds: &[f64]) -> Vec<f64> {
    rr_seconds.iter().map(|rr| rr * 1000.0).collect()
}
