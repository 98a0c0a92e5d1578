//! # Record - Sensor Line Parser
//!
//! Decodes one comma-delimited sensor line into a [`Record`]
//! (`timestamp`, `x`, `y`, `z`).
//!
//! Lines are parsed straight from bytes: the line is split on the delimiter
//! byte and each token is validated and converted on its own, so the whole
//! line is never decoded as text.
//!
//! ## Layouts
//!
//! ```text
//! raw   (7 fields): timestamp_us, x, y, z, -, -, -
//! event (9 fields): timestamp_us, secondary_us, x, y, z, -, -, -, -
//! ```
//!
//! The layout of a data file is fixed for its lifetime and detected once from
//! the field count of its first line (see [`Layout::detect`]).
//!
//! ## Example
//!
//! ```rust
//! use record::{parse_line, Layout};
//!
//! let rec = parse_line(b"1000,10,20,30,0,0,0", Layout::Raw).unwrap();
//! assert_eq!((rec.timestamp, rec.x, rec.y, rec.z), (1000, 10, 20, 30));
//! ```

use std::str::FromStr;
use thiserror::Error;

/// Field delimiter within a line.
pub const DELIMITER: u8 = b',';

/// Line terminator.
pub const NEWLINE: u8 = b'\n';

/// Record shape of a data file, identified by its field count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// 7 fields: timestamp, x, y, z and three unused columns.
    Raw,
    /// 9 fields: timestamp, secondary timestamp, x, y, z and four unused columns.
    Event,
}

impl Layout {
    /// Number of delimited fields every line of this layout carries.
    #[must_use]
    pub const fn field_count(self) -> usize {
        match self {
            Layout::Raw => 7,
            Layout::Event => 9,
        }
    }

    /// Maps a field count to its layout, `None` for any other count.
    #[must_use]
    pub const fn from_field_count(fields: usize) -> Option<Self> {
        match fields {
            7 => Some(Layout::Raw),
            9 => Some(Layout::Event),
            _ => None,
        }
    }

    /// Detects the layout of `line` (without its trailing newline) from its
    /// field count.
    #[must_use]
    pub fn detect(line: &[u8]) -> Option<Self> {
        Self::from_field_count(count_fields(line))
    }

    /// Column holding the `x` axis; `y` and `z` follow it.
    const fn axis_column(self) -> usize {
        match self {
            Layout::Raw => 1,
            Layout::Event => 2,
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Raw => write!(f, "raw"),
            Layout::Event => write!(f, "event"),
        }
    }
}

/// One decoded sensor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Record {
    /// Microseconds since the Unix epoch.
    pub timestamp: i64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Why a line failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("missing field")]
    MissingField,
    #[error("unexpected extra field")]
    UnexpectedField,
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("invalid number")]
    InvalidNumber,
    /// The timestamp parsed but has no calendar-time representation.
    #[error("timestamp out of range")]
    InvalidTimestamp,
}

/// A line that could not be decoded, with the zero-based column at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to parse column {column} ({kind})")]
pub struct ParseError {
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    #[must_use]
    pub const fn new(column: usize, kind: ParseErrorKind) -> Self {
        Self { column, kind }
    }
}

/// Counts delimiter-separated fields in `line`. An empty line has one
/// (empty) field.
#[must_use]
pub fn count_fields(line: &[u8]) -> usize {
    line.iter().filter(|&&b| b == DELIMITER).count() + 1
}

/// Decodes a full line (without its trailing newline) using `layout`.
///
/// The line must carry exactly `layout.field_count()` fields; a short line
/// fails with [`ParseErrorKind::MissingField`] instead of yielding a
/// partially filled record.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the first column that could not be read.
pub fn parse_line(line: &[u8], layout: Layout) -> Result<Record, ParseError> {
    let mut fields = Fields::new(line);

    let timestamp = fields.parse()?;
    // Event lines carry a secondary timestamp before the axes.
    while fields.column < layout.axis_column() {
        fields.skip()?;
    }
    let x = fields.parse()?;
    let y = fields.parse()?;
    let z = fields.parse()?;
    fields.finish(layout.field_count())?;

    Ok(Record { timestamp, x, y, z })
}

/// Parses only the leading timestamp field of `line`.
///
/// Everything after the first delimiter is ignored, so this also works on a
/// line whose tail has been cut off.
///
/// # Errors
///
/// Returns a [`ParseError`] for column 0 if the token is empty or not an
/// integer.
pub fn parse_timestamp(line: &[u8]) -> Result<i64, ParseError> {
    Fields::new(line).parse()
}

/// Cursor over the delimited tokens of one line.
struct Fields<'a> {
    rest: Option<&'a [u8]>,
    column: usize,
}

impl<'a> Fields<'a> {
    fn new(line: &'a [u8]) -> Self {
        Self {
            rest: Some(line),
            column: 0,
        }
    }

    fn next_token(&mut self) -> Result<(usize, &'a [u8]), ParseError> {
        let rest = self
            .rest
            .ok_or(ParseError::new(self.column, ParseErrorKind::MissingField))?;
        let column = self.column;
        self.column += 1;

        match rest.iter().position(|&b| b == DELIMITER) {
            Some(pos) => {
                self.rest = Some(&rest[pos + 1..]);
                Ok((column, &rest[..pos]))
            }
            None => {
                self.rest = None;
                Ok((column, rest))
            }
        }
    }

    fn parse<T: FromStr>(&mut self) -> Result<T, ParseError> {
        let (column, token) = self.next_token()?;
        if token.is_empty() {
            return Err(ParseError::new(column, ParseErrorKind::MissingField));
        }
        std::str::from_utf8(token)
            .map_err(|_| ParseError::new(column, ParseErrorKind::InvalidUtf8))?
            .parse()
            .map_err(|_| ParseError::new(column, ParseErrorKind::InvalidNumber))
    }

    fn skip(&mut self) -> Result<(), ParseError> {
        self.next_token().map(|_| ())
    }

    /// Consumes the remaining tokens and checks the total field count.
    fn finish(mut self, expected: usize) -> Result<(), ParseError> {
        while self.rest.is_some() {
            if self.column >= expected {
                return Err(ParseError::new(expected, ParseErrorKind::UnexpectedField));
            }
            self.skip()?;
        }
        if self.column < expected {
            return Err(ParseError::new(self.column, ParseErrorKind::MissingField));
        }
        Ok(())
    }
}
