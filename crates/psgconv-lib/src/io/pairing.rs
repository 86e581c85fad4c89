use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Recursively collect files carrying `extension` (without the dot),
/// sorted by the first run of digits in the filename. Digitless names sort
/// first, by name; name breaks ties between equal numbers.
pub fn scan_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(dir, extension, &mut found)?;
    found.sort_by_key(|path| {
        let name = file_name(path);
        (first_number(&name), name)
    });
    Ok(found)
}

fn walk(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("scanning directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("scanning directory {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, extension, found)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            found.push(path);
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

/// First run of ASCII digits in a filename, as a sort key.
fn first_number(name: &str) -> Option<u64> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: String = name[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    // Saturate instead of failing on absurdly long digit runs.
    Some(
        digits
            .bytes()
            .fold(0u64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as u64)),
    )
}

/// The annotation filename a signal file must pair with:
/// `{signal_stem}-profusion.{ext}`.
pub fn annotation_name(signal: &Path, annotation_ext: &str) -> Option<String> {
    let stem = signal.file_stem()?.to_str()?;
    Some(format!("{stem}-profusion.{annotation_ext}"))
}

/// Find the annotation whose filename matches the signal exactly. Prefix
/// overlaps (`case70-profusion.xml` for `case7.edf`) never match.
pub fn find_matching_annotation<'a>(
    signal: &Path,
    annotations: &'a [PathBuf],
    annotation_ext: &str,
) -> Option<&'a PathBuf> {
    let wanted = annotation_name(signal, annotation_ext)?;
    annotations
        .iter()
        .find(|path| file_name(path) == wanted)
}
