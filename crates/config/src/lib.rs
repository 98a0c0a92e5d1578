//! # Config - Reader Tuning
//!
//! Knobs shared by index construction and range queries.
//!
//! ```text
//! SEISMO_INDEX_STRIDE     bytes skipped between index samples  (default: 2048)
//! SEISMO_INDEX_LOOKAHEAD  bytes read at each sample point      (default: 256)
//! SEISMO_CHUNK_KB         query scan chunk size in KiB         (default: 1024)
//! SEISMO_ON_PARSE_ERROR   "abort" or "skip"                    (default: "abort")
//! ```
//!
//! A larger stride makes index builds faster and the sidecar smaller, at the
//! cost of more over-scan per query. The lookahead must be long enough to hold
//! two complete lines, otherwise no samples are taken past the first line.

use std::str::FromStr;
use thiserror::Error;

/// Default byte distance between successive index samples.
pub const DEFAULT_STRIDE: u64 = 2048;
/// Default size of the block read at each sample point.
pub const DEFAULT_LOOKAHEAD: usize = 256;
/// Default chunk size for streaming a query's byte range (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Largest stride that still yields seekable file offsets.
pub const MAX_STRIDE: u64 = i64::MAX as u64;
/// Largest lookahead block (1 MiB).
pub const MAX_LOOKAHEAD: usize = 1024 * 1024;
/// Largest query chunk (256 MiB).
pub const MAX_CHUNK_SIZE: usize = 256 * 1024 * 1024;

pub const ENV_STRIDE: &str = "SEISMO_INDEX_STRIDE";
pub const ENV_LOOKAHEAD: &str = "SEISMO_INDEX_LOOKAHEAD";
pub const ENV_CHUNK_KB: &str = "SEISMO_CHUNK_KB";
pub const ENV_ON_PARSE_ERROR: &str = "SEISMO_ON_PARSE_ERROR";

/// What a range query does with a line it cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Stop the query and report the failure together with the samples
    /// gathered before it.
    #[default]
    Abort,
    /// Record the failure in the result and keep scanning.
    Skip,
}

impl FromStr for ParsePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(ParsePolicy::Abort),
            "skip" => Ok(ParsePolicy::Skip),
            other => Err(ConfigError::InvalidValue {
                key: ENV_ON_PARSE_ERROR,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("stride must be at least 1 byte")]
    ZeroStride,

    #[error("stride {0} exceeds the largest seekable offset")]
    StrideTooLarge(u64),

    #[error("lookahead must be at least 2 bytes, got {0}")]
    LookaheadTooSmall(usize),

    #[error("lookahead {0} exceeds 1 MiB")]
    LookaheadTooLarge(usize),

    #[error("chunk size must be at least 1 byte")]
    ZeroChunkSize,

    #[error("chunk size {0} exceeds 256 MiB")]
    ChunkSizeTooLarge(usize),
}

/// Tuning for one data-file reader: index sampling and query streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Bytes to advance between index samples.
    pub stride: u64,
    /// Bytes to read at each sample point when looking for a line start.
    pub lookahead: usize,
    /// Bytes read per chunk while streaming a query range.
    pub chunk_size: usize,
    /// Handling of undecodable lines during queries.
    pub on_parse_error: ParsePolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            lookahead: DEFAULT_LOOKAHEAD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            on_parse_error: ParsePolicy::Abort,
        }
    }
}

impl ReaderConfig {
    #[must_use]
    pub fn with_stride(mut self, stride: u64) -> Self {
        self.stride = stride;
        self
    }

    #[must_use]
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.on_parse_error = policy;
        self
    }

    /// Checks that every knob is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stride == 0 {
            return Err(ConfigError::ZeroStride);
        }
        if self.stride > MAX_STRIDE {
            return Err(ConfigError::StrideTooLarge(self.stride));
        }
        if self.lookahead < 2 {
            return Err(ConfigError::LookaheadTooSmall(self.lookahead));
        }
        if self.lookahead > MAX_LOOKAHEAD {
            return Err(ConfigError::LookaheadTooLarge(self.lookahead));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkSizeTooLarge(self.chunk_size));
        }
        Ok(())
    }

    /// Builds a config from the `SEISMO_*` environment variables, using the
    /// defaults for any that are unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but does not
    /// parse, or any validation error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through
    /// `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(stride) = parse_var(&lookup, ENV_STRIDE)? {
            config.stride = stride;
        }
        if let Some(lookahead) = parse_var(&lookup, ENV_LOOKAHEAD)? {
            config.lookahead = lookahead;
        }
        if let Some(chunk_kb) = parse_var::<usize, _>(&lookup, ENV_CHUNK_KB)? {
            config.chunk_size = chunk_kb.saturating_mul(1024);
        }
        if let Some(raw) = lookup(ENV_ON_PARSE_ERROR) {
            config.on_parse_error = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
