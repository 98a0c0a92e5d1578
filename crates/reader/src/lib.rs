//! # Reader - Time-Windowed Access to Sensor Logs
//!
//! Opens one append-only sensor data file, makes sure a sparse index for it
//! is available, and answers range queries by seeking through that index.
//!
//! ## Open path
//!
//! ```text
//! open(path)
//!   │
//!   ├─ <path>.index exists and is not older than <path>?
//!   │      yes ─► load sidecar ──(corrupt?)──┐
//!   │      no  ───────────────────────────────┤
//!   │                                         ▼
//!   │                           sample file ─► save sidecar
//!   ▼
//! SeismoReader { file handle, index, layout }
//! ```
//!
//! ## Query path
//!
//! ```text
//! get_data(start, end)
//!   clamp start ─► lower_bound(start) - 1 ─► seek
//!   stream chunks ─► split lines ─► parse ─► keep start < ts <= end
//!   stop at first ts > end
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use reader::SeismoReader;
//!
//! let mut r = SeismoReader::open("seismodata.txt").unwrap();
//! let window = r.get_data(r.start_time(), r.start_time() + 10_000_000).unwrap();
//! for s in window.iter() {
//!     println!("{} {} {} {}", s.time, s.x, s.y, s.z);
//! }
//! r.close();
//! ```
//!
//! ## Threading
//!
//! A reader owns a single file handle whose cursor every operation moves, so
//! queries take `&mut self`. Separate readers over the same file are
//! independent and may live on different threads.

mod error;
mod sample;
mod scan;

pub use error::{QueryError, ReaderError};
pub use sample::{Columns, LineFailure, Sample, Window};

use config::ReaderConfig;
use index::{SidecarState, SparseIndex};
use record::Layout;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Why an index had to be built at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildReason {
    /// No sidecar existed.
    Missing,
    /// The data file was modified after the sidecar was written.
    Stale,
    /// The sidecar exists but could not be decoded.
    Corrupt,
}

/// Where the reader's index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Loaded,
    Built(BuildReason),
}

/// Read-only, time-windowed access to one sensor data file.
pub struct SeismoReader {
    path: PathBuf,
    index_path: PathBuf,
    /// Held open for the reader's lifetime; closed on [`close`](Self::close)
    /// or drop.
    pub(crate) file: File,
    pub(crate) index: SparseIndex,
    pub(crate) config: ReaderConfig,
    origin: IndexOrigin,
}

impl std::fmt::Debug for SeismoReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeismoReader")
            .field("path", &self.path)
            .field("index_path", &self.index_path)
            .field("layout", &self.index.layout())
            .field("index_entries", &self.index.len())
            .field("start_time", &self.start_time())
            .field("end_time", &self.end_time())
            .field("origin", &self.origin)
            .field("config", &self.config)
            .finish()
    }
}

impl SeismoReader {
    /// Opens `path` with the default [`ReaderConfig`].
    ///
    /// # Errors
    ///
    /// See [`open_with_config`](Self::open_with_config).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReaderError> {
        Self::open_with_config(path, ReaderConfig::default())
    }

    /// Opens `path`, loading its sidecar index when fresh and building (and
    /// saving) a new one otherwise.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::Config`] if `config` does not validate.
    /// - [`ReaderError::Io`] if the data file cannot be opened.
    /// - [`ReaderError::Index`] if the index cannot be built or persisted
    ///   (unknown layout, out-of-order timestamps, I/O). The reader is not
    ///   usable in that case and no sidecar is written.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self, ReaderError> {
        config.validate()?;

        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let index_path = index::sidecar_path(&path);

        let (index, origin) = Self::load_or_build(&mut file, &path, &index_path, &config)?;

        Ok(Self {
            path,
            index_path,
            file,
            index,
            config,
            origin,
        })
    }

    fn load_or_build(
        file: &mut File,
        path: &Path,
        index_path: &Path,
        config: &ReaderConfig,
    ) -> Result<(SparseIndex, IndexOrigin), ReaderError> {
        let reason = match index::sidecar_state(path, index_path)? {
            SidecarState::Missing => BuildReason::Missing,
            SidecarState::Stale => {
                warn!(path = %path.display(), "data file changed since index was written, rebuilding");
                BuildReason::Stale
            }
            SidecarState::Fresh => match index::load(index_path) {
                Ok(index) => {
                    info!(
                        path = %index_path.display(),
                        layout = %index.layout(),
                        entries = index.len(),
                        first = index.start_time(),
                        last = index.end_time(),
                        "index loaded"
                    );
                    return Ok((index, IndexOrigin::Loaded));
                }
                Err(e) if e.is_corrupt_sidecar() => {
                    warn!(path = %index_path.display(), error = %e, "unreadable index, rebuilding");
                    BuildReason::Corrupt
                }
                Err(e) => return Err(e.into()),
            },
        };

        let index = index::build_and_save(file, index_path, config)?;
        Ok((index, IndexOrigin::Built(reason)))
    }

    /// Smallest indexed timestamp, in microseconds.
    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.index.start_time()
    }

    /// Largest indexed timestamp, in microseconds. Records after the last
    /// sample may be newer; queries still return them.
    #[must_use]
    pub fn end_time(&self) -> i64 {
        self.index.end_time()
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.index.layout()
    }

    #[must_use]
    pub fn index(&self) -> &SparseIndex {
        &self.index
    }

    #[must_use]
    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Releases the file handle. Dropping the reader does the same.
    pub fn close(self) {
        debug!(path = %self.path.display(), "closing reader");
        drop(self.file);
    }
}

#[cfg(test)]
mod tests;
