//! Sidecar persistence and staleness detection.
//!
//! The index for `data.txt` lives at `data.txt.index`. A sidecar is fresh
//! when its modification time is at least the data file's; appending to the
//! data file bumps its mtime and so invalidates the sidecar.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::format::{read_index, write_index};
use crate::{IndexError, SparseIndex};

/// Suffix appended to the data file name to form the sidecar path.
pub const INDEX_SUFFIX: &str = ".index";

/// Temporary suffix used while a sidecar is being written.
const TMP_SUFFIX: &str = ".tmp";

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns `<data_path>.index`.
#[must_use]
pub fn sidecar_path(data_path: &Path) -> PathBuf {
    with_suffix(data_path, INDEX_SUFFIX)
}

/// How a sidecar relates to its data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarState {
    Missing,
    /// The data file was modified after the sidecar was written.
    Stale,
    Fresh,
}

/// Classifies the sidecar at `index_path` with a single stat of each file.
///
/// # Errors
///
/// Returns any metadata error other than a missing sidecar.
pub fn sidecar_state(data_path: &Path, index_path: &Path) -> io::Result<SidecarState> {
    let index_meta = match fs::metadata(index_path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SidecarState::Missing),
        Err(e) => return Err(e),
    };
    let data_modified = fs::metadata(data_path)?.modified()?;
    if index_meta.modified()? >= data_modified {
        Ok(SidecarState::Fresh)
    } else {
        Ok(SidecarState::Stale)
    }
}

/// Returns `true` if the sidecar exists and is at least as new as the data
/// file.
///
/// # Errors
///
/// See [`sidecar_state`].
pub fn is_fresh(data_path: &Path, index_path: &Path) -> io::Result<bool> {
    Ok(sidecar_state(data_path, index_path)? == SidecarState::Fresh)
}

/// Loads a sidecar written by [`save`].
///
/// # Errors
///
/// Returns [`IndexError::Io`] if the file cannot be read, or a sidecar
/// framing error if its contents are not a valid index.
pub fn load(index_path: &Path) -> Result<SparseIndex, IndexError> {
    let mut reader = BufReader::new(File::open(index_path)?);
    read_index(&mut reader)
}

/// Writes `index` to `index_path`, replacing any existing sidecar.
///
/// The index is written to `<index_path>.tmp`, synced, then renamed into
/// place, so readers never observe a half-written sidecar.
///
/// # Errors
///
/// Returns [`IndexError::Io`] on any I/O failure; nothing is retried.
pub fn save(index_path: &Path, index: &SparseIndex) -> Result<(), IndexError> {
    let tmp_path = with_suffix(index_path, TMP_SUFFIX);

    {
        let raw = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut file = BufWriter::new(raw);
        write_index(&mut file, index)?;
        file.flush()?;
        file.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, index_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    // Make the rename durable.
    if let Some(parent) = index_path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
