use crate::{
    detect::{detect_r_peaks, DetectorConfig},
    filter::{clean_rr, DEFAULT_CHANGE_THRESHOLD},
    metrics::{aggregate, EpochMetrics, DEFAULT_MIN_RR_COUNT},
    signal::{rr_to_millis, EcgTrace},
};
use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Epoch length shared with the sleep-stage annotation (seconds).
pub const SEGMENT_DURATION_S: f64 = 30.0;

/// Segments with fewer detected beats are treated as having no usable data.
pub const MIN_BEATS_PER_SEGMENT: usize = 5;

/// Knobs of the per-segment R-R pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Fixed segment duration in seconds.
    pub segment_s: f64,
    /// Beat detector settings.
    pub detector: DetectorConfig,
    /// Relative-change bound for the outlier filter.
    pub change_threshold: f64,
    /// Minimum filtered interval count for HR/RMSSD aggregation.
    pub min_rr_count: usize,
    /// Minimum detected beats before a segment counts as usable.
    pub min_beats: usize,
    /// Worker threads for the segment fan-out; `None` uses every core.
    pub workers: Option<usize>,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            segment_s: SEGMENT_DURATION_S,
            detector: DetectorConfig::default(),
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            min_rr_count: DEFAULT_MIN_RR_COUNT,
            min_beats: MIN_BEATS_PER_SEGMENT,
            workers: None,
        }
    }
}

/// Parallel map over the whole segments of a trace.
///
/// Results come back indexed by submission position regardless of
/// completion order; downstream alignment with sleep stages is purely
/// positional, so this ordering is a correctness requirement. Output
/// length is always `floor(total_samples / segment_samples)`.
pub fn map_segments<T, F>(trace: &EcgTrace, segment_s: f64, workers: Option<usize>, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, &[f64]) -> T + Sync,
{
    let n_segments = trace.segment_count(segment_s);
    let run = || {
        (0..n_segments)
            .into_par_iter()
            .map(|i| f(i, trace.segment(i, segment_s)))
            .collect::<Vec<T>>()
    };
    match workers {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
            Ok(pool.install(run))
        }
        None => Ok(run()),
    }
}

/// Detect beats in one segment and return its R-R intervals in seconds.
///
/// Soft-fails to `None` when the detector finds too few beats; the caller
/// keeps a placeholder so sibling segments and index alignment are
/// unaffected.
fn segment_rr_seconds(index: usize, samples: &[f64], fs: f64, cfg: &SegmentConfig) -> Option<Vec<f64>> {
    let peaks = detect_r_peaks(samples, fs, &cfg.detector);
    if peaks.len() < cfg.min_beats {
        warn!(
            "segment {}: only {} beats detected, skipping",
            index + 1,
            peaks.len()
        );
        return None;
    }
    Some(peaks.rr_seconds(fs))
}

/// Mode A: one `(heart rate, RMSSD)` outcome per 30 s segment.
pub fn metrics_per_segment(trace: &EcgTrace, cfg: &SegmentConfig) -> Result<Vec<EpochMetrics>> {
    let fs = trace.fs;
    info!(
        "segmenting {} samples at {fs} Hz into {} epochs",
        trace.len(),
        trace.segment_count(cfg.segment_s)
    );
    map_segments(trace, cfg.segment_s, cfg.workers, |index, samples| {
        match segment_rr_seconds(index, samples, fs, cfg) {
            Some(rr) => aggregate(&clean_rr(&rr, cfg.change_threshold), cfg.min_rr_count),
            None => EpochMetrics::Insufficient,
        }
    })
}

/// Mode B: the raw millisecond R-R sequence per segment; an empty sequence
/// marks a segment without usable data.
pub fn rr_per_segment(trace: &EcgTrace, cfg: &SegmentConfig) -> Result<Vec<Vec<f64>>> {
    let fs = trace.fs;
    info!(
        "segmenting {} samples at {fs} Hz into {} epochs",
        trace.len(),
        trace.segment_count(cfg.segment_s)
    );
    map_segments(trace, cfg.segment_s, cfg.workers, |index, samples| {
        match segment_rr_seconds(index, samples, fs, cfg) {
            Some(rr) => {
                info!("segment {}: {} rr intervals", index + 1, rr.len());
                rr_to_millis(&rr)
            }
            None => Vec::new(),
        }
    })
}
