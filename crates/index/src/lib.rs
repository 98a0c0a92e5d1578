//! # Index - Sparse Timestamp Index
//!
//! Maps sampled timestamps of a sensor data file to the byte offsets where
//! their lines begin, so range queries can seek instead of scanning the whole
//! file.
//!
//! ```text
//! data file                                   sparse index
//! ┌──────────────────────────────┐ offset 0   ┌──────────────┬────────┐
//! │ 1000,10,20,30,0,0,0          │ ◄───────── │ 1000         │ 0      │
//! │ 2000,11,21,31,0,0,0          │            │              │        │
//! │ ...                  stride  │            │              │        │
//! │ 91000,...                    │ ◄───────── │ 91000        │ 2093   │
//! │ ...                  stride  │            │              │        │
//! │ 182000,...                   │ ◄───────── │ 182000       │ 4187   │
//! └──────────────────────────────┘            └──────────────┴────────┘
//! ```
//!
//! Only one line every `stride` bytes is sampled (see [`builder`]), so
//! building costs `O(file_size / stride)` reads. The index is persisted next
//! to the data file as a binary sidecar (see [`format`] and [`store`]) and
//! reused until the data file changes.
//!
//! ## Invariants
//!
//! - never empty; the first entry is at offset 0,
//! - strictly increasing by timestamp,
//! - strictly increasing by offset.

mod builder;
mod error;
mod format;
mod store;

pub use builder::{build, build_and_save, MAX_LINE_BYTES};
pub use error::IndexError;
pub use format::{read_index, write_index, ENTRY_BYTES, HEADER_BYTES, INDEX_MAGIC, INDEX_VERSION, TRAILER_BYTES};
pub use store::{is_fresh, load, save, sidecar_path, sidecar_state, SidecarState, INDEX_SUFFIX};

use record::Layout;

/// One sampled line: its timestamp and where it starts in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Microseconds since the Unix epoch.
    pub timestamp: i64,
    pub byte_offset: u64,
}

impl IndexEntry {
    #[inline]
    #[must_use]
    pub const fn new(timestamp: i64, byte_offset: u64) -> Self {
        Self {
            timestamp,
            byte_offset,
        }
    }
}

/// Immutable sparse index over one data file, together with the file's
/// record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseIndex {
    layout: Layout,
    entries: Vec<IndexEntry>,
}

impl SparseIndex {
    /// Creates an index from already validated entries.
    ///
    /// Callers guarantee `entries` is non-empty; ordering is trusted.
    pub(crate) fn from_parts(layout: Layout, entries: Vec<IndexEntry>) -> Self {
        debug_assert!(!entries.is_empty());
        Self { layout, entries }
    }

    /// Creates an index from `entries`, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidEntries`] if `entries` is empty, does not
    /// start at offset 0, or is not strictly increasing by timestamp and
    /// offset.
    pub fn from_entries(layout: Layout, entries: Vec<IndexEntry>) -> Result<Self, IndexError> {
        match entries.first() {
            None => return Err(IndexError::InvalidEntries("index has no entries")),
            Some(first) if first.byte_offset != 0 => {
                return Err(IndexError::InvalidEntries("first entry must be at offset 0"))
            }
            Some(_) => {}
        }
        let ordered = entries
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp && w[0].byte_offset < w[1].byte_offset);
        if !ordered {
            return Err(IndexError::InvalidEntries("entries are not strictly increasing"));
        }
        Ok(Self::from_parts(layout, entries))
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: an index holds at least the first line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> &IndexEntry {
        &self.entries[0]
    }

    #[must_use]
    pub fn last(&self) -> &IndexEntry {
        &self.entries[self.entries.len() - 1]
    }

    /// Smallest indexed timestamp (the file's first line).
    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.first().timestamp
    }

    /// Largest indexed timestamp. Lines after the last sample may be newer.
    #[must_use]
    pub fn end_time(&self) -> i64 {
        self.last().timestamp
    }

    /// Leftmost position whose timestamp is not less than `target`.
    ///
    /// The result `p` satisfies `p == 0 || entries[p - 1].timestamp < target`
    /// and `p == len || entries[p].timestamp >= target`.
    #[must_use]
    pub fn lower_bound(&self, target: i64) -> usize {
        self.entries.partition_point(|e| e.timestamp < target)
    }

    /// Entry at `pos`, if any.
    #[must_use]
    pub fn get(&self, pos: usize) -> Option<&IndexEntry> {
        self.entries.get(pos)
    }
}

#[cfg(test)]
mod tests;
