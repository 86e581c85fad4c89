mod batch;

use anyhow::{Context, Result};
use batch::{run, BatchConfig, Mode};
use clap::Parser;
use psgconv_lib::filter::DEFAULT_CHANGE_THRESHOLD;
use psgconv_lib::metrics::DEFAULT_MIN_RR_COUNT;
use psgconv_lib::segment::{SegmentConfig, SEGMENT_DURATION_S};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "psgconv",
    version,
    about = "Batch-convert polysomnography recordings (EDF + profusion XML) into per-epoch CSV tables"
)]
struct Cli {
    /// Directory scanned recursively for raw signal files
    #[arg(long)]
    signals: PathBuf,
    /// Directory scanned recursively for annotation files
    #[arg(long)]
    annotations: PathBuf,
    /// Directory receiving one CSV per converted recording
    #[arg(long)]
    out: PathBuf,
    /// Per-epoch output: heart rate + RMSSD, or raw R-R intervals
    #[arg(long, value_enum, default_value = "hr-hrv")]
    mode: Mode,
    /// Signal channel to read
    #[arg(long, default_value = "ECG")]
    channel: String,
    /// Raw signal file extension
    #[arg(long, default_value = "edf")]
    signal_ext: String,
    /// Annotation file extension
    #[arg(long, default_value = "xml")]
    annotation_ext: String,
    /// Minimum epochs to attempt and to write (defaults per mode: 100/200)
    #[arg(long)]
    min_epochs: Option<usize>,
    /// Relative-change bound for the R-R outlier filter
    #[arg(long, default_value_t = DEFAULT_CHANGE_THRESHOLD)]
    change_threshold: f64,
    /// Minimum filtered R-R count to report epoch metrics
    #[arg(long, default_value_t = DEFAULT_MIN_RR_COUNT)]
    min_rr_count: usize,
    /// Segment duration in seconds
    #[arg(long, default_value_t = SEGMENT_DURATION_S)]
    segment_s: f64,
    /// Worker threads for the segment fan-out (default: all cores)
    #[arg(long)]
    workers: Option<usize>,
    /// Optional TOML file overriding the tuning flags above
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Tuning knobs that may come from a TOML file instead of flags.
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    channel: Option<String>,
    min_epochs: Option<usize>,
    change_threshold: Option<f64>,
    min_rr_count: Option<usize>,
    segment_s: Option<f64>,
    workers: Option<usize>,
}

fn load_overrides(path: &PathBuf) -> Result<FileOverrides> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let mut cli = Cli::parse();

    if let Some(path) = cli.config.take() {
        let overrides = load_overrides(&path)?;
        if let Some(channel) = overrides.channel {
            cli.channel = channel;
        }
        if let Some(min_epochs) = overrides.min_epochs {
            cli.min_epochs = Some(min_epochs);
        }
        if let Some(threshold) = overrides.change_threshold {
            cli.change_threshold = threshold;
        }
        if let Some(count) = overrides.min_rr_count {
            cli.min_rr_count = count;
        }
        if let Some(segment_s) = overrides.segment_s {
            cli.segment_s = segment_s;
        }
        if let Some(workers) = overrides.workers {
            cli.workers = Some(workers);
        }
    }

    let cfg = BatchConfig {
        signal_dir: cli.signals,
        annotation_dir: cli.annotations,
        output_dir: cli.out,
        signal_ext: cli.signal_ext,
        annotation_ext: cli.annotation_ext,
        channel: cli.channel,
        mode: cli.mode,
        min_epochs: cli.min_epochs,
        segments: SegmentConfig {
            segment_s: cli.segment_s,
            change_threshold: cli.change_threshold,
            min_rr_count: cli.min_rr_count,
            workers: cli.workers,
            ..SegmentConfig::default()
        },
    };

    let stats = run(&cfg)?;
    println!(
        "processed {} files: {} succeeded, {} failed",
        stats.processed, stats.succeeded, stats.failed
    );
    Ok(())
}
