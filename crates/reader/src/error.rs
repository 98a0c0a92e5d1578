use config::ConfigError;
use index::IndexError;
use std::io;
use thiserror::Error;

use crate::sample::{LineFailure, Window};

/// Errors that prevent a reader from opening.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from a range query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The scan hit an undecodable line under
    /// [`ParsePolicy::Abort`](config::ParsePolicy::Abort). `partial` holds
    /// the samples accepted before that line and is never merged with it.
    #[error("query aborted after {} samples: {failure}", .partial.len())]
    Malformed {
        #[source]
        failure: LineFailure,
        partial: Window,
    },
}
