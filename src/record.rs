//! Typed records and the per-line parser.
//!
//! A samples file carries `<date>,<numerator>,<denominator>` rows, a labels
//! file carries `<date>,<text>` rows. Dates are ISO calendar dates; the
//! legacy `YYYY.MM.DD` spelling is normalized to `YYYY-MM-DD` before
//! parsing.

use csv::StringRecord;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

pub type Timestamp = PrimitiveDateTime;

pub const SAMPLE_FIELDS: usize = 3;
pub const LABEL_FIELDS: usize = 2;
pub const DEFAULT_HEADER_SENTINEL: &str = "Start";

/// One depth measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub timestamp: Timestamp,
    /// Weighted sum component (e.g. total depth-volume product).
    pub numerator: i64,
    /// Count component (number of depth observations). Never negative.
    pub denominator: i64,
}

impl Sample {
    pub fn new(timestamp: Timestamp, numerator: i64, denominator: i64) -> Self {
        Self {
            timestamp,
            numerator,
            denominator,
        }
    }

    /// `numerator / denominator`, or 0 when the denominator is 0.
    pub fn ratio(&self) -> f64 {
        ratio(self.numerator as f64, self.denominator as f64)
    }
}

/// Timestamped annotation drawn as a marker on the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub timestamp: Timestamp,
    pub text: String,
}

/// Outcome of parsing a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Record(T),
    Skip,
}

impl<T> Parsed<T> {
    pub fn into_record(self) -> Option<T> {
        match self {
            Parsed::Record(record) => Some(record),
            Parsed::Skip => None,
        }
    }
}

/// Why a row was rejected. The loader attaches file and line context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RecordError(String);

impl RecordError {
    fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Converts delimited rows into [`Sample`]s and [`Label`]s.
#[derive(Debug, Clone)]
pub struct RecordParser {
    header_sentinel: String,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_SENTINEL)
    }
}

impl RecordParser {
    pub fn new(header_sentinel: impl Into<String>) -> Self {
        Self {
            header_sentinel: header_sentinel.into(),
        }
    }

    /// Parse a samples row. Blank rows and rows starting with the header
    /// sentinel are skipped.
    pub fn parse_sample(&self, record: &StringRecord) -> Result<Parsed<Sample>, RecordError> {
        if is_blank(record) {
            return Ok(Parsed::Skip);
        }
        if !self.header_sentinel.is_empty()
            && record
                .get(0)
                .is_some_and(|first| first.starts_with(self.header_sentinel.as_str()))
        {
            return Ok(Parsed::Skip);
        }
        expect_fields(record, SAMPLE_FIELDS)?;

        let timestamp = parse_timestamp(&record[0])?;
        let numerator = parse_int(&record[1], "numerator")?;
        let denominator = parse_int(&record[2], "denominator")?;
        if denominator < 0 {
            return Err(RecordError::new(format!(
                "negative denominator: {denominator}"
            )));
        }
        Ok(Parsed::Record(Sample::new(timestamp, numerator, denominator)))
    }

    /// Parse a labels row. Only blank rows are skipped; the text keeps
    /// leading whitespace and loses trailing whitespace.
    pub fn parse_label(&self, record: &StringRecord) -> Result<Parsed<Label>, RecordError> {
        if is_blank(record) {
            return Ok(Parsed::Skip);
        }
        expect_fields(record, LABEL_FIELDS)?;

        let timestamp = parse_timestamp(&record[0])?;
        Ok(Parsed::Record(Label {
            timestamp,
            text: record[1].trim_end().to_string(),
        }))
    }
}

/// Parse `YYYY-MM-DD` with an optional `THH:MM[:SS]` / ` HH:MM[:SS]` suffix.
/// Every `.` is rewritten to `-` first.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, RecordError> {
    let normalized = raw.trim().replace('.', "-");
    let (date_part, time_part) = match normalized.find(|c: char| c == 'T' || c == ' ') {
        Some(idx) => (&normalized[..idx], Some(normalized[idx + 1..].trim())),
        None => (normalized.as_str(), None),
    };

    let date = Date::parse(date_part, format_description!("[year]-[month]-[day]"))
        .map_err(|err| RecordError::new(format!("invalid date {raw:?}: {err}")))?;
    let time = match time_part {
        None => Time::MIDNIGHT,
        Some(value) => Time::parse(value, format_description!("[hour]:[minute]:[second]"))
            .or_else(|_| Time::parse(value, format_description!("[hour]:[minute]")))
            .map_err(|err| RecordError::new(format!("invalid time of day {raw:?}: {err}")))?,
    };
    Ok(PrimitiveDateTime::new(date, time))
}

pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn expect_fields(record: &StringRecord, expected: usize) -> Result<(), RecordError> {
    if record.len() != expected {
        return Err(RecordError::new(format!(
            "expected {expected} fields, found {}",
            record.len()
        )));
    }
    Ok(())
}

fn parse_int(value: &str, name: &str) -> Result<i64, RecordError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| RecordError::new(format!("invalid {name}: {value:?}")))
}
