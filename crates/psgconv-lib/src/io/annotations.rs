use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

/// Extract every `SleepStage` element from a profusion annotation
/// document, at any nesting depth, in document order.
pub fn extract_sleep_stages(path: &Path) -> Result<Vec<i64>> {
    let mut reader = Reader::from_file(path)
        .with_context(|| format!("opening annotation file {}", path.display()))?;
    let mut buf = Vec::new();
    let mut stages = Vec::new();
    let mut in_stage = false;
    loop {
        match reader
            .read_event_into(&mut buf)
            .with_context(|| format!("parsing annotation file {}", path.display()))?
        {
            Event::Start(start) if start.local_name().as_ref() == b"SleepStage" => {
                in_stage = true;
            }
            Event::Text(text) if in_stage => {
                let raw = text.unescape().context("decoding SleepStage text")?;
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    let stage = trimmed
                        .parse::<i64>()
                        .with_context(|| format!("parsing SleepStage value {trimmed:?}"))?;
                    stages.push(stage);
                }
            }
            Event::End(end) if end.local_name().as_ref() == b"SleepStage" => {
                in_stage = false;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(stages)
}
