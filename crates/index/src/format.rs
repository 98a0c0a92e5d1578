//! Binary sidecar format.
//!
//! ```text
//! HEADER   (16 bytes)
//!   magic (u32 LE) "SXI1" | version (u16 LE) | layout (u8) | reserved (u8) | entry_count (u64 LE)
//! ENTRIES  (16 bytes each)
//!   timestamp (i64 LE) | byte_offset (u64 LE)
//! TRAILER  (4 bytes)
//!   crc32 (u32 LE) over HEADER + ENTRIES
//! ```
//!
//! The layout byte stores the layout's field count (7 = raw, 9 = event).
//! Readers check the magic first, then the version, so a sidecar from an
//! incompatible writer is reported as such rather than as a checksum failure.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use record::Layout;
use std::io::{Read, Result as IoResult, Write};

use crate::{IndexEntry, IndexError, SparseIndex};

/// Magic number identifying sidecar index files (ASCII "SXI1").
pub const INDEX_MAGIC: u32 = 0x5358_4931;

/// Current sidecar format version.
pub const INDEX_VERSION: u16 = 1;

/// Header size: 4 (`magic`) + 2 (`version`) + 1 (`layout`) + 1 (reserved) + 8 (`entry_count`).
pub const HEADER_BYTES: usize = 4 + 2 + 1 + 1 + 8;

/// Size of one serialized entry: 8 (`timestamp`) + 8 (`byte_offset`).
pub const ENTRY_BYTES: usize = 8 + 8;

/// Trailer size: 4 (`crc32`).
pub const TRAILER_BYTES: usize = 4;

/// Total encoded size of an index with `entries` entries.
fn encoded_len(entries: u64) -> Option<u64> {
    entries
        .checked_mul(ENTRY_BYTES as u64)?
        .checked_add((HEADER_BYTES + TRAILER_BYTES) as u64)
}

/// Serializes `index` to `w` in a single `write_all`.
pub fn write_index<W: Write>(w: &mut W, index: &SparseIndex) -> IoResult<()> {
    let mut buf = Vec::with_capacity(HEADER_BYTES + index.len() * ENTRY_BYTES + TRAILER_BYTES);

    buf.write_u32::<LittleEndian>(INDEX_MAGIC)?;
    buf.write_u16::<LittleEndian>(INDEX_VERSION)?;
    buf.write_u8(index.layout().field_count() as u8)?;
    buf.write_u8(0)?;
    buf.write_u64::<LittleEndian>(index.len() as u64)?;

    for entry in index.entries() {
        buf.write_i64::<LittleEndian>(entry.timestamp)?;
        buf.write_u64::<LittleEndian>(entry.byte_offset)?;
    }

    let mut hasher = Crc32::new();
    hasher.update(&buf);
    buf.write_u32::<LittleEndian>(hasher.finalize())?;

    w.write_all(&buf)
}

/// Deserializes an index from `r`, consuming it to the end.
///
/// Framing (magic, version, length, checksum, layout) is verified; entry
/// ordering is trusted as written.
///
/// # Errors
///
/// Returns [`IndexError::Io`] on read failure, or one of the sidecar variants
/// ([`IndexError::is_corrupt_sidecar`]) if the bytes are not a valid index.
pub fn read_index<R: Read>(r: &mut R) -> Result<SparseIndex, IndexError> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    let actual_len = buf.len() as u64;

    let min_len = (HEADER_BYTES + TRAILER_BYTES) as u64;
    if actual_len < min_len {
        return Err(IndexError::Truncated {
            expected: min_len,
            actual: actual_len,
        });
    }

    let mut header = &buf[..HEADER_BYTES];
    let magic = header.read_u32::<LittleEndian>()?;
    if magic != INDEX_MAGIC {
        return Err(IndexError::BadMagic(magic));
    }
    let version = header.read_u16::<LittleEndian>()?;
    if version != INDEX_VERSION {
        return Err(IndexError::UnsupportedVersion(version));
    }
    let layout_code = header.read_u8()?;
    let _reserved = header.read_u8()?;
    let count = header.read_u64::<LittleEndian>()?;

    match encoded_len(count) {
        Some(expected) if expected == actual_len => {}
        expected => {
            return Err(IndexError::Truncated {
                expected: expected.unwrap_or(u64::MAX),
                actual: actual_len,
            })
        }
    }

    let body_len = buf.len() - TRAILER_BYTES;
    let stored_crc = (&buf[body_len..]).read_u32::<LittleEndian>()?;
    let mut hasher = Crc32::new();
    hasher.update(&buf[..body_len]);
    let actual_crc = hasher.finalize();
    if actual_crc != stored_crc {
        return Err(IndexError::ChecksumMismatch {
            expected: stored_crc,
            actual: actual_crc,
        });
    }

    let layout = Layout::from_field_count(layout_code as usize)
        .ok_or(IndexError::UnknownLayout(layout_code))?;
    if count == 0 {
        return Err(IndexError::InvalidEntries("index has no entries"));
    }

    let mut body = &buf[HEADER_BYTES..body_len];
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let timestamp = body.read_i64::<LittleEndian>()?;
        let byte_offset = body.read_u64::<LittleEndian>()?;
        entries.push(IndexEntry::new(timestamp, byte_offset));
    }

    Ok(SparseIndex::from_parts(layout, entries))
}
