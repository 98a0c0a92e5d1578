//! Query result types.

use chrono::{DateTime, Utc};
use record::{ParseError, ParseErrorKind, Record};
use thiserror::Error;

/// Longest slice of a bad line kept in a [`LineFailure`].
const MAX_FAILURE_CONTEXT: usize = 256;

/// One record inside a query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Calendar time of the record.
    pub time: DateTime<Utc>,
    /// Raw timestamp in microseconds since the Unix epoch.
    pub timestamp_us: i64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Sample {
    /// Converts a decoded record, failing with
    /// [`ParseErrorKind::InvalidTimestamp`] if its timestamp has no calendar
    /// representation.
    pub fn from_record(record: Record) -> Result<Self, ParseError> {
        let time = DateTime::from_timestamp_micros(record.timestamp)
            .ok_or(ParseError::new(0, ParseErrorKind::InvalidTimestamp))?;
        Ok(Self {
            time,
            timestamp_us: record.timestamp,
            x: record.x,
            y: record.y,
            z: record.z,
        })
    }
}

/// A line that could not be decoded during a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad line at offset {offset}: {error}")]
pub struct LineFailure {
    /// Byte offset of the line start in the data file.
    pub offset: u64,
    /// The line, lossily decoded and cut to a bounded length.
    pub line: String,
    #[source]
    pub error: ParseError,
}

impl LineFailure {
    pub(crate) fn new(offset: u64, line: &[u8], error: ParseError) -> Self {
        let shown = &line[..line.len().min(MAX_FAILURE_CONTEXT)];
        Self {
            offset,
            line: String::from_utf8_lossy(shown).into_owned(),
            error,
        }
    }
}

/// Result of a range query: the matching samples in ascending time order,
/// plus any lines skipped under [`ParsePolicy::Skip`](config::ParsePolicy).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    pub samples: Vec<Sample>,
    pub skipped: Vec<LineFailure>,
}

/// The four parallel sequences of a window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    pub timestamps: Vec<DateTime<Utc>>,
    pub x: Vec<i32>,
    pub y: Vec<i32>,
    pub z: Vec<i32>,
}

impl Window {
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Splits the samples into timestamp, x, y and z columns.
    #[must_use]
    pub fn into_columns(self) -> Columns {
        let n = self.samples.len();
        let mut cols = Columns {
            timestamps: Vec::with_capacity(n),
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
        };
        for s in self.samples {
            cols.timestamps.push(s.time);
            cols.x.push(s.x);
            cols.y.push(s.y);
            cols.z.push(s.z);
        }
        cols
    }
}
