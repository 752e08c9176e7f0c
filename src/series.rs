//! Ordered sample and label storage.
//!
//! Files are read once, sorted once, and never mutated afterwards. Both the
//! rolling aggregator and the chart read the same ordered view.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::record::{
    Label, Parsed, RecordError, RecordParser, Sample, Timestamp, DEFAULT_HEADER_SENTINEL,
};

/// Ingestion options shared by the samples and labels readers.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Field separator.
    /// Default: `,`
    pub delimiter: u8,
    /// Prefix marking header rows in a samples file.
    /// Default: `Start`
    pub header_sentinel: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            header_sentinel: DEFAULT_HEADER_SENTINEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: u64,
    pub skipped: u64,
    pub first: Option<Timestamp>,
    pub last: Option<Timestamp>,
}

pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

impl Timestamped for Sample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Timestamped for Label {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// A sequence that is non-decreasing by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    items: Vec<T>,
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Timestamped> Series<T> {
    /// Stable sort by timestamp; equal timestamps keep their input order.
    pub fn from_unsorted(mut items: Vec<T>) -> Self {
        items.sort_by_key(Timestamped::timestamp);
        Self { items }
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.items.first().map(Timestamped::timestamp)
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.items.last().map(Timestamped::timestamp)
    }
}

impl<T> Series<T> {
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Timestamped> FromIterator<T> for Series<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a Series<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Owns the samples and labels of one invocation.
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    samples: Series<Sample>,
    labels: Series<Label>,
}

impl SeriesStore {
    pub fn new(samples: Vec<Sample>, labels: Vec<Label>) -> Self {
        Self {
            samples: Series::from_unsorted(samples),
            labels: Series::from_unsorted(labels),
        }
    }

    /// Read the samples file and, if given, the labels file.
    ///
    /// # Errors
    ///
    /// - `Error::MissingFile`: a path cannot be opened
    /// - `Error::MalformedRecord`: a row fails to parse; nothing is loaded
    pub fn load(
        samples_path: &Path,
        labels_path: Option<&Path>,
        config: &IngestConfig,
    ) -> Result<Self> {
        let (samples, stats) = read_samples(samples_path, config)?;
        info!(
            "loaded {} samples from {} ({} rows skipped, range {:?}..{:?})",
            stats.rows,
            samples_path.display(),
            stats.skipped,
            stats.first,
            stats.last
        );

        let labels = match labels_path {
            Some(path) => {
                let (labels, stats) = read_labels(path, config)?;
                info!("loaded {} labels from {}", stats.rows, path.display());
                labels
            }
            None => Vec::new(),
        };

        Ok(Self::new(samples, labels))
    }

    pub fn samples(&self) -> &Series<Sample> {
        &self.samples
    }

    pub fn labels(&self) -> &Series<Label> {
        &self.labels
    }

    /// Point-wise `numerator / denominator`, 0 where the denominator is 0.
    pub fn ratios(&self) -> Vec<(Timestamp, f64)> {
        self.samples
            .iter()
            .map(|sample| (sample.timestamp, sample.ratio()))
            .collect()
    }
}

pub fn read_samples(path: &Path, config: &IngestConfig) -> Result<(Vec<Sample>, IngestStats)> {
    let parser = RecordParser::new(config.header_sentinel.as_str());
    read_records(path, config, Trim::All, |record| parser.parse_sample(record))
}

pub fn read_labels(path: &Path, config: &IngestConfig) -> Result<(Vec<Label>, IngestStats)> {
    let parser = RecordParser::new(config.header_sentinel.as_str());
    // Label text keeps its leading whitespace.
    read_records(path, config, Trim::None, |record| parser.parse_label(record))
}

fn read_records<T, F>(
    path: &Path,
    config: &IngestConfig,
    trim: Trim,
    parse: F,
) -> Result<(Vec<T>, IngestStats)>
where
    T: Timestamped,
    F: Fn(&StringRecord) -> std::result::Result<Parsed<T>, RecordError>,
{
    let file = File::open(path).map_err(|source| Error::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(trim)
        .delimiter(config.delimiter)
        .from_reader(file);

    let mut items = Vec::new();
    let mut stats = IngestStats::default();
    let mut raw = ByteRecord::new();
    while reader
        .read_byte_record(&mut raw)
        .map_err(|err| unreadable(path, err))?
    {
        let line = raw.position().map_or(0, |pos| pos.line());
        let record = match StringRecord::from_byte_record(std::mem::take(&mut raw)) {
            Ok(record) => record,
            Err(err) => {
                let lossy = StringRecord::from_byte_record_lossy(err.into_byte_record());
                return Err(malformed(path, line, &lossy, config.delimiter, "invalid UTF-8"));
            }
        };
        match parse(&record) {
            Ok(Parsed::Record(item)) => {
                let ts = item.timestamp();
                stats.first = Some(stats.first.map_or(ts, |first| first.min(ts)));
                stats.last = Some(stats.last.map_or(ts, |last| last.max(ts)));
                stats.rows += 1;
                items.push(item);
            }
            Ok(Parsed::Skip) => stats.skipped += 1,
            Err(err) => {
                return Err(malformed(path, line, &record, config.delimiter, err.reason()));
            }
        }
    }

    debug!("{}: {} rows, {} skipped", path.display(), stats.rows, stats.skipped);
    Ok((items, stats))
}

fn malformed(
    path: &Path,
    line: u64,
    record: &StringRecord,
    delimiter: u8,
    reason: &str,
) -> Error {
    let separator = char::from(delimiter).to_string();
    Error::MalformedRecord {
        path: PathBuf::from(path),
        line,
        content: record.iter().collect::<Vec<_>>().join(&separator),
        reason: reason.to_string(),
    }
}

fn unreadable(path: &Path, err: csv::Error) -> Error {
    Error::MalformedRecord {
        path: PathBuf::from(path),
        line: err.position().map_or(0, |pos| pos.line()),
        content: String::new(),
        reason: err.to_string(),
    }
}
