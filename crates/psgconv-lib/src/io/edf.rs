use crate::signal::EcgTrace;
use anyhow::{anyhow, Context, Result};
use edf_reader::file_reader::SyncFileReader;
use edf_reader::sync_reader::SyncEDFReader;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Helper implementing the EDF reader trait for on-disk files.
struct DiskFileReader {
    path: PathBuf,
}

impl DiskFileReader {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SyncFileReader for DiskFileReader {
    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>, std::io::Error> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Load one EDF channel by label (labels are compared after trimming the
/// padding EDF headers carry) into an `EcgTrace` with its own per-channel
/// sampling rate.
pub fn load_named_channel(path: &Path, label: &str) -> Result<EcgTrace> {
    let reader = SyncEDFReader::init_with_file_reader(DiskFileReader::new(path))
        .with_context(|| format!("reading EDF header of {}", path.display()))?;
    let wanted = label.trim();
    let channel = reader
        .edf_header
        .channels
        .iter()
        .position(|ch| ch.label.trim() == wanted)
        .ok_or_else(|| {
            anyhow!(
                "channel {wanted:?} not present in {} (has: {})",
                path.display(),
                reader
                    .edf_header
                    .channels
                    .iter()
                    .map(|ch| ch.label.trim())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;

    let total_duration = reader.edf_header.block_duration * reader.edf_header.number_of_blocks;
    let data_matrix = reader
        .read_data_window(0, total_duration)
        .with_context(|| format!("reading samples of {}", path.display()))?;
    let channel_data = data_matrix
        .get(channel)
        .ok_or_else(|| anyhow!("missing channel data"))?;
    let hdr_chan = &reader.edf_header.channels[channel];
    // block_duration is carried in milliseconds by the header.
    let fs = hdr_chan.number_of_samples_in_data_record as f64 * 1000.0
        / reader.edf_header.block_duration as f64;
    Ok(EcgTrace {
        fs,
        data: channel_data.iter().map(|value| *value as f64).collect(),
    })
}
