//! Read path: get_data().
//!
//! A query seeks to the sample just before the window start, then streams the
//! file in fixed-size chunks until the line that passes the window end (or the
//! byte bound derived from the index). Lines split across chunk boundaries are
//! carried over and completed by the next chunk before they are parsed.

use config::ParsePolicy;
use record::{parse_line, parse_timestamp, Layout, NEWLINE};
use std::io::{self, Read, Seek, SeekFrom};
use tracing::{debug, warn};

use crate::error::QueryError;
use crate::sample::{LineFailure, Sample, Window};
use crate::SeismoReader;

impl SeismoReader {
    /// Returns every record with `start < timestamp <= end`, in ascending
    /// time order.
    ///
    /// `start` is clamped to [`start_time`](Self::start_time), so any start
    /// before the first record behaves like the first record's timestamp. A
    /// window with `start >= end` (after clamping) is empty and reads nothing.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Io`] on read failure.
    /// - [`QueryError::Malformed`] when a line in range cannot be decoded and
    ///   the policy is [`ParsePolicy::Abort`]. The samples gathered before the
    ///   bad line travel inside the error.
    pub fn get_data(&mut self, start: i64, end: i64) -> Result<Window, QueryError> {
        let start = start.max(self.index.start_time());
        if start >= end {
            return Ok(Window::default());
        }

        // The sparse index may skip the first matching record, so begin one
        // sample before the lower bound.
        let lo = self.index.lower_bound(start).saturating_sub(1);
        let from = self.index.entries()[lo].byte_offset;

        // Records equal to `end` can start at the lower-bound sample itself,
        // so the scan is bounded by the sample after it (or end of file).
        let hi = self.index.lower_bound(end);
        let to = self.index.get(hi + 1).map(|e| e.byte_offset);

        debug!(start, end, from, to = ?to, "range query");

        let scan = Scan {
            start,
            end,
            layout: self.index.layout(),
            chunk_size: self.config.chunk_size,
            policy: self.config.on_parse_error,
        };
        scan.run(&mut self.file, from, to)
    }
}

/// Parameters of one streaming pass over a byte range.
pub(crate) struct Scan {
    pub start: i64,
    pub end: i64,
    pub layout: Layout,
    pub chunk_size: usize,
    pub policy: ParsePolicy,
}

enum Step {
    Accept(Sample),
    Ignore,
    PastEnd,
}

impl Scan {
    /// Streams `[from, to)` of `r` (to end of input when `to` is `None`).
    pub(crate) fn run<R: Read + Seek>(
        &self,
        r: &mut R,
        from: u64,
        to: Option<u64>,
    ) -> Result<Window, QueryError> {
        r.seek(SeekFrom::Start(from))?;

        let mut window = Window::default();
        let mut chunk = vec![0u8; self.chunk_size];
        // Bytes of an incomplete line carried into the next chunk.
        let mut pending: Vec<u8> = Vec::new();
        let mut pending_offset = from;
        let mut remaining = to.map(|to| to.saturating_sub(from));

        'scan: loop {
            let want = match remaining {
                Some(0) => break,
                Some(left) => left.min(self.chunk_size as u64) as usize,
                None => self.chunk_size,
            };
            let n = read_some(r, &mut chunk[..want])?;
            if n == 0 {
                if !pending.is_empty() {
                    // A record still being appended; never parse a fragment.
                    debug!(offset = pending_offset, bytes = pending.len(), "ignoring unterminated tail");
                }
                break;
            }
            if let Some(left) = remaining.as_mut() {
                *left -= n as u64;
            }
            pending.extend_from_slice(&chunk[..n]);

            let mut consumed = 0;
            while let Some(pos) = pending[consumed..].iter().position(|&b| b == NEWLINE) {
                let line_offset = pending_offset + consumed as u64;
                let line = &pending[consumed..consumed + pos];
                consumed += pos + 1;

                match self.step(line) {
                    Ok(Step::Accept(sample)) => window.samples.push(sample),
                    Ok(Step::Ignore) => {}
                    Ok(Step::PastEnd) => break 'scan,
                    Err(error) => {
                        let failure = LineFailure::new(line_offset, line, error);
                        match self.policy {
                            ParsePolicy::Abort => {
                                return Err(QueryError::Malformed {
                                    failure,
                                    partial: window,
                                })
                            }
                            ParsePolicy::Skip => {
                                warn!(offset = line_offset, error = %failure.error, "skipping malformed line");
                                window.skipped.push(failure);
                            }
                        }
                    }
                }
            }

            pending.drain(..consumed);
            pending_offset += consumed as u64;
        }

        Ok(window)
    }

    /// Only lines whose timestamp falls inside the window are fully decoded.
    fn step(&self, line: &[u8]) -> Result<Step, record::ParseError> {
        let ts = parse_timestamp(line)?;
        if ts > self.end {
            return Ok(Step::PastEnd);
        }
        if ts <= self.start {
            return Ok(Step::Ignore);
        }
        let rec = parse_line(line, self.layout)?;
        Sample::from_record(rec).map(Step::Accept)
    }
}

fn read_some<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match r.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
