use record::ParseError;
use std::io;
use thiserror::Error;

/// Errors raised while building, loading or saving a sparse index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// An underlying I/O error, passed through unchanged.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("data file is empty")]
    EmptyFile,

    /// The first line is not a known layout.
    #[error("invalid data format, expected 7 or 9 columns, got {fields}")]
    Format { fields: usize },

    #[error("first line exceeds {limit} bytes without a newline")]
    FirstLineTooLong { limit: usize },

    /// The first line does not begin with an integer timestamp.
    #[error("unparsable timestamp at offset {offset}: {source}")]
    Parse { offset: u64, source: ParseError },

    /// A sampled timestamp did not increase. `previous_context` and `context`
    /// hold the raw bytes at both sample points, lossily decoded.
    #[error(
        "timestamps are not in order at offset {offset}, previous: {previous}, current: {current}"
    )]
    Ordering {
        previous: i64,
        current: i64,
        offset: u64,
        previous_context: String,
        context: String,
    },

    #[error("invalid index: {0}")]
    InvalidEntries(&'static str),

    #[error("unknown sidecar magic: {0:#x}")]
    BadMagic(u32),

    #[error("unsupported sidecar version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown layout code {0} in sidecar")]
    UnknownLayout(u8),

    #[error("sidecar length mismatch: expected {expected} bytes, found {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("sidecar CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

impl IndexError {
    /// Returns `true` for sidecar framing failures: a sidecar that exists but
    /// cannot be trusted and should simply be rebuilt.
    #[must_use]
    pub fn is_corrupt_sidecar(&self) -> bool {
        matches!(
            self,
            IndexError::InvalidEntries(_)
                | IndexError::BadMagic(_)
                | IndexError::UnsupportedVersion(_)
                | IndexError::UnknownLayout(_)
                | IndexError::Truncated { .. }
                | IndexError::ChecksumMismatch { .. }
        )
    }
}
