use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use time::macros::datetime;

use depthplot::series::{read_labels, IngestConfig, SeriesStore};
use depthplot::Error;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn any_row_order_loads_sorted() {
    let rows = [
        "2024-01-05,5,1",
        "2024-01-01,1,1",
        "2024.01.03,3,1",
        "2024-01-02,2,1",
        "2024-01-04,4,1",
    ];
    let dir = tempdir().expect("tempdir");

    // Every rotation of the rows must come out in the same order.
    for shift in 0..rows.len() {
        let mut rotated = rows.to_vec();
        rotated.rotate_left(shift);
        let body = format!("Start,depthsum,depths\n{}\n", rotated.join("\n"));
        let path = write(dir.path(), "results.csv", &body);

        let store = SeriesStore::load(&path, None, &IngestConfig::default()).expect("load");
        let samples = store.samples().as_slice();
        assert_eq!(samples.len(), rows.len());
        assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        let numerators: Vec<i64> = samples.iter().map(|s| s.numerator).collect();
        assert_eq!(numerators, vec![1, 2, 3, 4, 5]);
    }
}

#[test]
fn labels_are_loaded_sorted() {
    let dir = tempdir().expect("tempdir");
    let samples = write(dir.path(), "results.csv", "2024-01-01,1,1\n");
    let labels = write(
        dir.path(),
        "labels.csv",
        "2024-02-01,release 2\n\n2024.01.15,release 1\n",
    );

    let store =
        SeriesStore::load(&samples, Some(&labels), &IngestConfig::default()).expect("load");
    let texts: Vec<&str> = store.labels().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["release 1", "release 2"]);
    assert_eq!(
        store.labels().first_timestamp(),
        Some(datetime!(2024-01-15 0:00))
    );
}

#[test]
fn quoted_label_text_may_contain_delimiter() {
    let dir = tempdir().expect("tempdir");
    let labels = write(dir.path(), "labels.csv", "2024-01-01,\"fees, v2\"\n");
    let (labels, stats) = read_labels(&labels, &IngestConfig::default()).expect("labels");
    assert_eq!(stats.rows, 1);
    assert_eq!(labels[0].text, "fees, v2");
}

#[test]
fn malformed_sample_aborts_with_location() {
    let dir = tempdir().expect("tempdir");
    let path = write(
        dir.path(),
        "results.csv",
        "Start\n2024-01-01,1,1\n2024-01-02,1\n2024-01-03,1,1\n",
    );

    let err = SeriesStore::load(&path, None, &IngestConfig::default()).unwrap_err();
    assert_eq!(err.line(), Some(3));
    let message = err.to_string();
    assert!(message.contains("results.csv:3"), "{message}");
    assert!(message.contains("expected 3 fields, found 2"), "{message}");
}

#[test]
fn label_text_keeps_leading_whitespace() {
    let dir = tempdir().expect("tempdir");
    let labels = write(dir.path(), "labels.csv", "  2024-01-01, v2  \n");
    let (labels, _) = read_labels(&labels, &IngestConfig::default()).expect("labels");
    assert_eq!(labels[0].text, " v2");
    assert_eq!(labels[0].timestamp, datetime!(2024-01-01 0:00));
}

#[test]
fn invalid_utf8_is_a_malformed_record() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("depth.csv");
    fs::write(&path, b"2024-01-01,1,1\n2024-01-02,\xff\xfe,1\n").expect("write fixture");

    let err = SeriesStore::load(&path, None, &IngestConfig::default()).unwrap_err();
    match &err {
        Error::MalformedRecord {
            path: at,
            line,
            content,
            reason,
        } => {
            assert_eq!(at, &path);
            assert_eq!(*line, 2);
            assert!(content.starts_with("2024-01-02,"), "{content}");
            assert_eq!(reason, "invalid UTF-8");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("depth.csv:2"), "{err}");
}

#[test]
fn malformed_label_aborts() {
    let dir = tempdir().expect("tempdir");
    let samples = write(dir.path(), "results.csv", "2024-01-01,1,1\n");
    let labels = write(dir.path(), "labels.csv", "not-a-date,launch\n");

    let err = SeriesStore::load(&samples, Some(&labels), &IngestConfig::default()).unwrap_err();
    match err {
        Error::MalformedRecord { path, line, .. } => {
            assert_eq!(path, labels);
            assert_eq!(line, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_inputs_are_reported() {
    let dir = tempdir().expect("tempdir");
    let samples = write(dir.path(), "results.csv", "2024-01-01,1,1\n");
    let missing = dir.path().join("labels.csv");

    let err = SeriesStore::load(&samples, Some(&missing), &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingFile { ref path, .. } if path == &missing));

    let err = SeriesStore::load(&missing, None, &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingFile { .. }));
}

#[test]
fn header_only_file_is_an_empty_series() {
    let dir = tempdir().expect("tempdir");
    let path = write(dir.path(), "results.csv", "Start,depthsum,depths\n\n");
    let store = SeriesStore::load(&path, None, &IngestConfig::default()).expect("load");
    assert!(store.samples().is_empty());
    assert!(store.ratios().is_empty());
}
