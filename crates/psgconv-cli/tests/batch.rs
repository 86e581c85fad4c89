use assert_cmd::cargo::cargo_bin_cmd;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn fixed(text: &str, width: usize) -> Vec<u8> {
    let mut out = text.as_bytes().to_vec();
    assert!(out.len() <= width);
    out.resize(width, b' ');
    out
}

/// Single-channel EDF with identity digital-to-physical scaling and
/// one-second data records.
fn write_edf(path: &Path, label: &str, fs: usize, samples: &[i16]) {
    let records = samples.len() / fs;
    let mut header = Vec::new();
    header.extend(fixed("0", 8));
    header.extend(fixed("synthetic patient", 80));
    header.extend(fixed("synthetic recording", 80));
    header.extend(fixed("01.01.25", 8));
    header.extend(fixed("00.00.00", 8));
    header.extend(fixed("512", 8));
    header.extend(fixed("", 44));
    header.extend(fixed(&records.to_string(), 8));
    header.extend(fixed("1", 8));
    header.extend(fixed("1", 4));
    header.extend(fixed(label, 16));
    header.extend(fixed("test electrode", 80));
    header.extend(fixed("uV", 8));
    header.extend(fixed("-32768", 8));
    header.extend(fixed("32767", 8));
    header.extend(fixed("-32768", 8));
    header.extend(fixed("32767", 8));
    header.extend(fixed("", 80));
    header.extend(fixed(&fs.to_string(), 8));
    header.extend(fixed("", 32));

    let mut file = File::create(path).expect("create EDF fixture");
    file.write_all(&header).expect("write header");
    for sample in &samples[..records * fs] {
        file.write_all(&sample.to_le_bytes()).expect("write sample");
    }
}

/// Gaussian R-bumps every `rr_s` seconds over a quiet baseline.
fn synthetic_ecg_i16(fs: f64, duration_s: f64, rr_s: f64) -> Vec<i16> {
    let samples = (fs * duration_s) as usize;
    let mut beats = Vec::new();
    let mut t = 0.5;
    while t < duration_s {
        beats.push(t);
        t += rr_s;
    }
    (0..samples)
        .map(|i| {
            let time = i as f64 / fs;
            let mut v = 0.05 * (2.0 * std::f64::consts::PI * time).sin();
            for &bt in &beats {
                if (time - bt).abs() < 0.2 {
                    v += 1.2 * (-0.5 * ((time - bt) / 0.02).powi(2)).exp();
                }
            }
            (v * 1000.0).round() as i16
        })
        .collect()
}

fn write_profusion_xml(path: &Path, stages: &[i64]) {
    let mut body = String::from("<?xml version=\"1.0\"?>\n<CMPStudyConfig>\n  <SleepStages>\n");
    for stage in stages {
        body.push_str(&format!("    <SleepStage>{stage}</SleepStage>\n"));
    }
    body.push_str("  </SleepStages>\n</CMPStudyConfig>\n");
    std::fs::write(path, body).expect("write annotation fixture");
}

struct Dataset {
    _root: tempfile::TempDir,
    signals: std::path::PathBuf,
    annotations: std::path::PathBuf,
    out: std::path::PathBuf,
}

/// case7.edf with a valid annotation (plus a prefix-overlap decoy) and
/// case9.edf with none.
fn build_dataset() -> Dataset {
    let root = tempfile::tempdir().expect("tempdir");
    let signals = root.path().join("edf");
    let annotations = root.path().join("xml");
    let out = root.path().join("csv");
    std::fs::create_dir_all(&signals).expect("mkdir");
    std::fs::create_dir_all(&annotations).expect("mkdir");

    let fs = 100usize;
    let ecg = synthetic_ecg_i16(fs as f64, 150.0, 0.8);
    write_edf(&signals.join("case7.edf"), "ECG", fs, &ecg);
    write_edf(&signals.join("case9.edf"), "ECG", fs, &ecg);

    write_profusion_xml(&annotations.join("case7-profusion.xml"), &[0, 1, 2, 3, 2, 2]);
    // Prefix overlap that must never match case7.edf.
    write_profusion_xml(&annotations.join("case70-profusion.xml"), &[9, 9, 9]);

    Dataset {
        _root: root,
        signals,
        annotations,
        out,
    }
}

fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).expect("open output table");
    reader.records().map(|r| r.expect("row")).collect()
}

#[test]
fn converts_paired_recording_and_counts_unpaired_as_failure() -> Result<(), Box<dyn Error>> {
    let dataset = build_dataset();

    let mut cmd = cargo_bin_cmd!("psgconv");
    cmd.args([
        "--signals",
        dataset.signals.to_str().expect("utf8 path"),
        "--annotations",
        dataset.annotations.to_str().expect("utf8 path"),
        "--out",
        dataset.out.to_str().expect("utf8 path"),
        "--min-epochs",
        "3",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output)?;
    assert!(
        stdout.contains("processed 2 files: 1 succeeded, 1 failed"),
        "unexpected summary: {stdout}"
    );

    let table = dataset.out.join("case7.csv");
    let rows = read_rows(&table);
    // 5 whole segments against 6 annotated epochs.
    assert_eq!(rows.len(), 5);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row[0].parse::<usize>()?, i + 1);
        assert_eq!(row[1].parse::<usize>()?, (i + 1) * 30);
        let hr = row[2].parse::<f64>()?;
        assert!((hr - 75.0).abs() < 5.0, "row {i} heart rate {hr}");
        let rmssd = row[3].parse::<f64>()?;
        assert!((0.0..50.0).contains(&rmssd), "row {i} rmssd {rmssd}");
    }
    let stage_col: Vec<&str> = rows.iter().map(|r| &r[4]).collect();
    assert_eq!(stage_col, vec!["0", "1", "2", "3", "2"]);

    assert!(!dataset.out.join("case9.csv").exists());
    Ok(())
}

#[test]
fn raw_rr_mode_writes_interval_cells() -> Result<(), Box<dyn Error>> {
    let dataset = build_dataset();

    let mut cmd = cargo_bin_cmd!("psgconv");
    cmd.args([
        "--signals",
        dataset.signals.to_str().expect("utf8 path"),
        "--annotations",
        dataset.annotations.to_str().expect("utf8 path"),
        "--out",
        dataset.out.to_str().expect("utf8 path"),
        "--mode",
        "raw-rr",
        "--min-epochs",
        "3",
    ]);
    cmd.assert().success();

    let rows = read_rows(&dataset.out.join("case7.csv"));
    assert_eq!(rows.len(), 5);
    let cell = &rows[0][2];
    assert!(cell.contains(';'), "expected joined intervals, got {cell:?}");
    let first: f64 = cell.split(';').next().expect("interval").parse()?;
    assert!((first - 800.0).abs() < 50.0, "first rr {first}");
    Ok(())
}

#[test]
fn short_annotation_is_skipped() -> Result<(), Box<dyn Error>> {
    let dataset = build_dataset();

    let mut cmd = cargo_bin_cmd!("psgconv");
    cmd.args([
        "--signals",
        dataset.signals.to_str().expect("utf8 path"),
        "--annotations",
        dataset.annotations.to_str().expect("utf8 path"),
        "--out",
        dataset.out.to_str().expect("utf8 path"),
        "--min-epochs",
        "500",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output)?;
    assert!(
        stdout.contains("processed 2 files: 0 succeeded, 2 failed"),
        "unexpected summary: {stdout}"
    );
    assert!(!dataset.out.join("case7.csv").exists());
    Ok(())
}
