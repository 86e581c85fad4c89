use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use psgconv_lib::io::{
    annotations::extract_sleep_stages,
    edf::load_named_channel,
    pairing::{find_matching_annotation, scan_files},
    table::{aligned_len, write_metrics_table, write_rr_table},
};
use psgconv_lib::segment::{metrics_per_segment, rr_per_segment, SegmentConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What each 30 s epoch carries in the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// One heart-rate / RMSSD pair per epoch.
    HrHrv,
    /// The raw millisecond R-R intervals per epoch.
    RawRr,
}

impl Mode {
    /// Admission gate: annotation and aligned sequences shorter than this
    /// cause the file to be skipped.
    pub fn default_min_epochs(self) -> usize {
        match self {
            Mode::HrHrv => 100,
            Mode::RawRr => 200,
        }
    }
}

/// One batch run over a dataset directory pair.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub signal_dir: PathBuf,
    pub annotation_dir: PathBuf,
    pub output_dir: PathBuf,
    pub signal_ext: String,
    pub annotation_ext: String,
    pub channel: String,
    pub mode: Mode,
    /// Overrides the per-mode default when set.
    pub min_epochs: Option<usize>,
    pub segments: SegmentConfig,
}

impl BatchConfig {
    fn min_epochs(&self) -> usize {
        self.min_epochs.unwrap_or(self.mode.default_min_epochs())
    }
}

/// Why a file was skipped rather than converted. Skips are data, counted
/// as failures; they never abort the batch.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("no matching annotation file")]
    MissingAnnotation,
    #[error("annotation has {have} epochs, need at least {need}")]
    TooFewEpochs { have: usize, need: usize },
    #[error("aligned output has {have} epochs, need more than {need}")]
    ShortAlignment { have: usize, need: usize },
}

pub enum FileOutcome {
    Written { rows: usize },
    Skipped(SkipReason),
}

/// Running success/failure counts for one batch invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Process every signal file in the configured directory, strictly
/// sequentially; parallelism lives inside the per-file segment fan-out.
/// Only startup errors (unreadable root directories, output dir creation)
/// propagate out of here.
pub fn run(cfg: &BatchConfig) -> Result<RunStats> {
    let signals = scan_files(&cfg.signal_dir, &cfg.signal_ext)?;
    let annotations = scan_files(&cfg.annotation_dir, &cfg.annotation_ext)?;
    std::fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating output directory {}", cfg.output_dir.display()))?;
    info!(
        "found {} .{} files and {} .{} annotation files",
        signals.len(),
        cfg.signal_ext,
        annotations.len(),
        cfg.annotation_ext
    );

    let bar = ProgressBar::new(signals.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut stats = RunStats::default();
    for signal in &signals {
        let name = signal
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<non-utf8>");
        stats.processed += 1;
        bar.set_message(format!(
            "{name} ok:{} fail:{}",
            stats.succeeded, stats.failed
        ));
        match process_file(signal, &annotations, cfg) {
            Ok(FileOutcome::Written { rows }) => {
                stats.succeeded += 1;
                info!("{name}: wrote {rows} rows");
            }
            Ok(FileOutcome::Skipped(reason)) => {
                stats.failed += 1;
                warn!("{name}: skipped: {reason}");
            }
            Err(err) => {
                // File-level failures stop here; the batch moves on.
                stats.failed += 1;
                error!("{}: {err:#}", signal.display());
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message(format!("ok:{} fail:{}", stats.succeeded, stats.failed));
    Ok(stats)
}

fn process_file(
    signal: &Path,
    annotations: &[PathBuf],
    cfg: &BatchConfig,
) -> Result<FileOutcome> {
    let Some(annotation) = find_matching_annotation(signal, annotations, &cfg.annotation_ext)
    else {
        return Ok(FileOutcome::Skipped(SkipReason::MissingAnnotation));
    };

    let stages = extract_sleep_stages(annotation)?;
    let min_epochs = cfg.min_epochs();
    if stages.len() < min_epochs {
        return Ok(FileOutcome::Skipped(SkipReason::TooFewEpochs {
            have: stages.len(),
            need: min_epochs,
        }));
    }

    let trace = load_named_channel(signal, &cfg.channel)?;
    info!(
        "{}: {} channel has {} samples at {} Hz",
        signal.display(),
        cfg.channel,
        trace.len(),
        trace.fs
    );

    let stem = signal
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("signal filename is not valid UTF-8"))?;
    let out_path = cfg.output_dir.join(format!("{stem}.csv"));

    let rows = match cfg.mode {
        Mode::HrHrv => {
            let metrics = metrics_per_segment(&trace, &cfg.segments)?;
            let have = aligned_len(&[metrics.len(), stages.len()]);
            if have <= min_epochs {
                return Ok(FileOutcome::Skipped(SkipReason::ShortAlignment {
                    have,
                    need: min_epochs,
                }));
            }
            write_metrics_table(&out_path, &metrics, &stages)?
        }
        Mode::RawRr => {
            let rr = rr_per_segment(&trace, &cfg.segments)?;
            let have = aligned_len(&[rr.len(), stages.len()]);
            if have <= min_epochs {
                return Ok(FileOutcome::Skipped(SkipReason::ShortAlignment {
                    have,
                    need: min_epochs,
                }));
            }
            write_rr_table(&out_path, &rr, &stages)?
        }
    };

    Ok(FileOutcome::Written { rows })
}
