//! Index construction by sparse sampling.
//!
//! ```text
//!  first line ─┐   stride    lookahead   stride    lookahead
//!              ▼ ◄────────► ┌─────────┐ ◄────────► ┌─────────┐
//!  ...,\n ────────────────► │..\n..\nT│ ─────────► │.\n...\nT│ ...
//!                           └─────────┘            └─────────┘
//!                                     ▲                      ▲
//!                            sampled line start     sampled line start
//! ```
//!
//! After the first line, the cursor repeatedly skips `stride` bytes and reads
//! a `lookahead` block. The line starting after the block's *second* newline
//! is sampled: its leading timestamp and absolute offset become the next
//! entry. Scanning stops at the first block that does not contain two
//! newlines, which includes reading past end of file, or once the next block
//! would start beyond a seekable offset. A sampled line whose leading token is
//! not a timestamp (a blank or damaged line) is skipped; only the first line
//! must parse.

use config::ReaderConfig;
use record::{count_fields, parse_timestamp, Layout, DELIMITER, NEWLINE};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{store, IndexEntry, IndexError, SparseIndex};

/// Longest first line accepted before giving up on layout detection (64 KiB).
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Builds a sparse index over `data` without reading the whole file.
///
/// # Errors
///
/// - [`IndexError::EmptyFile`] / [`IndexError::Format`] /
///   [`IndexError::FirstLineTooLong`] if no layout can be detected,
/// - [`IndexError::Parse`] if the first line does not start with a timestamp,
/// - [`IndexError::Ordering`] if a sampled timestamp does not increase,
/// - [`IndexError::Io`] on read failure.
///
/// On error no partial index is returned.
pub fn build<R: Read + Seek>(data: &mut R, config: &ReaderConfig) -> Result<SparseIndex, IndexError> {
    data.seek(SeekFrom::Start(0))?;

    let mut first_line = Vec::new();
    let consumed = BufReader::new(&mut *data)
        .take(MAX_LINE_BYTES as u64)
        .read_until(NEWLINE, &mut first_line)?;
    if consumed == 0 {
        return Err(IndexError::EmptyFile);
    }
    let terminated = first_line.last() == Some(&NEWLINE);
    if !terminated && consumed == MAX_LINE_BYTES {
        return Err(IndexError::FirstLineTooLong {
            limit: MAX_LINE_BYTES,
        });
    }
    if terminated {
        first_line.pop();
    }

    let layout = Layout::detect(&first_line).ok_or_else(|| IndexError::Format {
        fields: count_fields(&first_line),
    })?;
    let first_timestamp = parse_timestamp(&first_line)
        .map_err(|source| IndexError::Parse { offset: 0, source })?;

    let mut entries = vec![IndexEntry::new(first_timestamp, 0)];
    let mut previous_context = first_line;

    let mut cursor = consumed as u64;
    let mut block = vec![0u8; config.lookahead];

    loop {
        // Offsets past i64::MAX cannot be seeked to.
        let Some(block_start) = cursor
            .checked_add(config.stride)
            .filter(|&pos| pos <= i64::MAX as u64)
        else {
            break;
        };
        data.seek(SeekFrom::Start(block_start))?;
        let n = read_block(data, &mut block)?;
        cursor = block_start + n as u64;

        let Some(line_start) = second_line_start(&block[..n]) else {
            break;
        };
        let tail = &block[line_start..n];

        // A token still running at the end of the block may be cut off.
        let Some(token_end) = tail.iter().position(|&b| b == DELIMITER || b == NEWLINE) else {
            debug!(offset = block_start + line_start as u64, "sample cut off by lookahead, skipped");
            continue;
        };

        let offset = block_start + line_start as u64;
        let timestamp = match parse_timestamp(&tail[..token_end]) {
            Ok(ts) => ts,
            Err(error) => {
                warn!(offset, %error, "unparsable sampled line, skipped");
                continue;
            }
        };

        let previous = entries[entries.len() - 1].timestamp;
        if timestamp <= previous {
            return Err(IndexError::Ordering {
                previous,
                current: timestamp,
                offset,
                previous_context: String::from_utf8_lossy(&previous_context).into_owned(),
                context: String::from_utf8_lossy(tail).into_owned(),
            });
        }

        entries.push(IndexEntry::new(timestamp, offset));
        previous_context = tail.to_vec();
    }

    Ok(SparseIndex::from_parts(layout, entries))
}

/// Builds an index over `data` and persists it to `index_path`.
///
/// Nothing is written if the build fails.
///
/// # Errors
///
/// Any error from [`build`] or [`store::save`].
pub fn build_and_save<R: Read + Seek>(
    data: &mut R,
    index_path: &Path,
    config: &ReaderConfig,
) -> Result<SparseIndex, IndexError> {
    let index = build(data, config)?;
    store::save(index_path, &index)?;
    info!(
        path = %index_path.display(),
        layout = %index.layout(),
        entries = index.len(),
        first = index.start_time(),
        last = index.end_time(),
        "index created"
    );
    Ok(index)
}

/// Position just past the second newline in `block`, if there is one.
pub(crate) fn second_line_start(block: &[u8]) -> Option<usize> {
    let first = block.iter().position(|&b| b == NEWLINE)?;
    let second = first + 1 + block[first + 1..].iter().position(|&b| b == NEWLINE)?;
    Some(second + 1)
}

/// Fills `buf` from `r`, stopping early only at end of input.
fn read_block<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
