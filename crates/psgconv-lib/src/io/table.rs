use crate::metrics::EpochMetrics;
use anyhow::{Context, Result};
use std::path::Path;

/// Seconds per output row; `timestamp = index * EPOCH_S`.
pub const EPOCH_S: u64 = 30;

/// Common minimum length across aligned sequences.
pub fn aligned_len(lengths: &[usize]) -> usize {
    lengths.iter().copied().min().unwrap_or(0)
}

/// Write the mode A table: `index,timestamp,heart_rate,hrv,sleep_stage`.
///
/// Sequences are truncated to their common minimum length, so no row ever
/// references an index beyond any input's bounds. Returns the row count.
pub fn write_metrics_table(
    path: &Path,
    metrics: &[EpochMetrics],
    stages: &[i64],
) -> Result<usize> {
    let rows = aligned_len(&[metrics.len(), stages.len()]);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating output table {}", path.display()))?;
    writer.write_record(["index", "timestamp", "heart_rate", "hrv", "sleep_stage"])?;
    for (i, (m, stage)) in metrics.iter().zip(stages).take(rows).enumerate() {
        let index = (i + 1) as u64;
        writer.write_record([
            index.to_string(),
            (index * EPOCH_S).to_string(),
            format_value(m.heart_rate()),
            format_value(m.rmssd()),
            stage.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(rows)
}

/// Write the mode B table: `index,timestamp,rr,sleep_stage`, with each
/// epoch's millisecond R-R intervals joined by `;` in one cell (empty cell
/// for a segment without usable data). Returns the row count.
pub fn write_rr_table(path: &Path, rr: &[Vec<f64>], stages: &[i64]) -> Result<usize> {
    let rows = aligned_len(&[rr.len(), stages.len()]);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating output table {}", path.display()))?;
    writer.write_record(["index", "timestamp", "rr", "sleep_stage"])?;
    for (i, (intervals, stage)) in rr.iter().zip(stages).take(rows).enumerate() {
        let index = (i + 1) as u64;
        let cell = intervals
            .iter()
            .map(|ms| format!("{ms:.2}"))
            .collect::<Vec<_>>()
            .join(";");
        writer.write_record([
            index.to_string(),
            (index * EPOCH_S).to_string(),
            cell,
            stage.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(rows)
}

/// Metrics carry the -1 sentinel for insufficient data; keep it integral
/// in the table instead of printing -1.00.
fn format_value(value: f64) -> String {
    if value < 0.0 {
        "-1".to_string()
    } else {
        format!("{value:.2}")
    }
}
