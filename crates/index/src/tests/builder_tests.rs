use super::raw_lines;
use crate::builder::second_line_start;
use crate::*;
use anyhow::Result;
use config::ReaderConfig;
use record::Layout;
use std::io::Cursor;
use tempfile::tempdir;

fn small_stride() -> ReaderConfig {
    ReaderConfig::default().with_stride(64).with_lookahead(64)
}

/// Every entry must point at the start of a line carrying its timestamp.
fn assert_entries_point_at_lines(data: &[u8], index: &SparseIndex) {
    for entry in index.entries() {
        let off = entry.byte_offset as usize;
        assert!(off == 0 || data[off - 1] == b'\n', "offset {} is not a line start", off);
        let prefix = format!("{},", entry.timestamp);
        assert!(
            data[off..].starts_with(prefix.as_bytes()),
            "line at {} does not start with {}",
            off,
            prefix
        );
    }
}

// -------------------- Sampling --------------------

#[test]
fn small_file_has_only_first_entry() -> Result<()> {
    let data = raw_lines([1000, 2000, 3000]);
    let index = build(&mut Cursor::new(&data), &ReaderConfig::default())?;
    assert_eq!(index.len(), 1);
    assert_eq!(*index.first(), IndexEntry::new(1000, 0));
    assert_eq!(index.layout(), Layout::Raw);
    Ok(())
}

#[test]
fn samples_are_ordered_line_starts() -> Result<()> {
    let data = raw_lines((0..2_000).map(|i| 1_000_000 + i * 250));
    let index = build(&mut Cursor::new(&data), &small_stride())?;

    assert!(index.len() > 10, "expected many samples, got {}", index.len());
    assert_eq!(index.first().byte_offset, 0);
    for w in index.entries().windows(2) {
        assert!(w[0].timestamp < w[1].timestamp);
        assert!(w[0].byte_offset < w[1].byte_offset);
    }
    assert_entries_point_at_lines(&data, &index);
    Ok(())
}

#[test]
fn sampling_is_sparse() -> Result<()> {
    let data = raw_lines((0..5_000).map(|i| 10_000 + i));
    let config = ReaderConfig::default().with_stride(1024).with_lookahead(128);
    let index = build(&mut Cursor::new(&data), &config)?;
    // One sample per stride + lookahead at most.
    let max = data.len() / (1024 + 128) + 2;
    assert!(index.len() <= max, "{} entries for {} bytes", index.len(), data.len());
    assert!(index.len() > 1);
    Ok(())
}

#[test]
fn event_layout_detected() -> Result<()> {
    let mut data = Vec::new();
    for i in 0..500i64 {
        data.extend_from_slice(format!("{},{},1,2,3,4,5,6,7\n", 5_000 + i * 10, i).as_bytes());
    }
    let index = build(&mut Cursor::new(&data), &small_stride())?;
    assert_eq!(index.layout(), Layout::Event);
    assert!(index.len() > 1);
    assert_entries_point_at_lines(&data, &index);
    Ok(())
}

#[test]
fn lookahead_too_short_for_two_lines_stops_after_first() -> Result<()> {
    let data = raw_lines((0..1_000).map(|i| 1_000 + i));
    let config = ReaderConfig::default().with_stride(16).with_lookahead(2);
    let index = build(&mut Cursor::new(&data), &config)?;
    assert_eq!(index.len(), 1);
    Ok(())
}

#[test]
fn first_line_without_newline() -> Result<()> {
    let data = b"1000,10,20,30,0,0,0".to_vec();
    let index = build(&mut Cursor::new(&data), &ReaderConfig::default())?;
    assert_eq!(index.len(), 1);
    assert_eq!(index.start_time(), 1000);
    Ok(())
}

#[test]
fn damaged_lines_do_not_stop_sampling() -> Result<()> {
    for junk in ["\n", "garbage\n", ",1,2,3,0,0,0\n"] {
        let mut data = raw_lines((0..200).map(|i| 10_000 + i * 10));
        data.extend_from_slice(junk.as_bytes());
        data.extend(raw_lines((200..400).map(|i| 10_000 + i * 10)));

        for stride in 40..140 {
            let config = ReaderConfig::default().with_stride(stride).with_lookahead(64);
            let index = build(&mut Cursor::new(&data), &config)?;
            assert!(index.len() > 10, "stride {stride} junk {junk:?}");
            assert!(index.end_time() > 10_000 + 200 * 10);
            assert_entries_point_at_lines(&data, &index);
        }
    }
    Ok(())
}

#[test]
fn huge_stride_yields_first_entry_only() -> Result<()> {
    let data = raw_lines((0..100).map(|i| 1_000 + i));
    for stride in [i64::MAX as u64 - 5, i64::MAX as u64 + 1, u64::MAX] {
        let config = ReaderConfig::default().with_stride(stride);
        let index = build(&mut Cursor::new(&data), &config)?;
        assert_eq!(index.entries(), &[IndexEntry::new(1_000, 0)]);
    }
    Ok(())
}

#[test]
fn second_line_start_positions() {
    assert_eq!(second_line_start(b"ab\ncd\nef"), Some(6));
    assert_eq!(second_line_start(b"\n\n"), Some(2));
    assert_eq!(second_line_start(b"ab\ncd"), None);
    assert_eq!(second_line_start(b""), None);
}

// -------------------- Failures --------------------

#[test]
fn empty_file_rejected() {
    let err = build(&mut Cursor::new(Vec::new()), &ReaderConfig::default()).unwrap_err();
    assert!(matches!(err, IndexError::EmptyFile));
}

#[test]
fn wrong_column_count_rejected() {
    let data = b"1000,1,2,3,4,5,6,7\n2000,1,2,3,4,5,6,7\n".to_vec();
    let err = build(&mut Cursor::new(data), &ReaderConfig::default()).unwrap_err();
    assert!(matches!(err, IndexError::Format { fields: 8 }));
}

#[test]
fn unparsable_first_timestamp_rejected() {
    let data = b"abc,1,2,3,4,5,6\n".to_vec();
    let err = build(&mut Cursor::new(data), &ReaderConfig::default()).unwrap_err();
    assert!(matches!(err, IndexError::Parse { offset: 0, .. }));
}

#[test]
fn overlong_first_line_rejected() {
    let data = vec![b'1'; MAX_LINE_BYTES + 10];
    let err = build(&mut Cursor::new(data), &ReaderConfig::default()).unwrap_err();
    assert!(matches!(err, IndexError::FirstLineTooLong { .. }));
}

#[test]
fn out_of_order_samples_rejected() {
    let mut data = raw_lines((0..200).map(|i| 100_000 + i * 10));
    data.extend(raw_lines((0..200).map(|i| 50_000 + i)));
    let err = build(&mut Cursor::new(&data), &small_stride()).unwrap_err();
    match err {
        IndexError::Ordering {
            previous,
            current,
            offset,
            previous_context,
            context,
        } => {
            assert!(current <= previous);
            assert!((offset as usize) < data.len());
            assert!(!previous_context.is_empty());
            assert!(context.starts_with(&current.to_string()));
        }
        other => panic!("expected ordering error, got {:?}", other),
    }
}

#[test]
fn repeated_timestamps_rejected() {
    let data = raw_lines(std::iter::repeat(7_000).take(500));
    let err = build(&mut Cursor::new(&data), &small_stride()).unwrap_err();
    assert!(matches!(
        err,
        IndexError::Ordering {
            previous: 7_000,
            current: 7_000,
            ..
        }
    ));
}

#[test]
fn failed_build_writes_no_sidecar() -> Result<()> {
    let dir = tempdir()?;
    let index_path = dir.path().join("data.txt.index");

    let mut data = raw_lines((0..200).map(|i| 100_000 + i * 10));
    data.extend(raw_lines((0..200).map(|i| 50_000 + i)));

    let result = build_and_save(&mut Cursor::new(&data), &index_path, &small_stride());
    assert!(result.is_err());
    assert!(!index_path.exists());
    Ok(())
}

#[test]
fn build_and_save_persists() -> Result<()> {
    let dir = tempdir()?;
    let index_path = dir.path().join("data.txt.index");
    let data = raw_lines((0..1_000).map(|i| 1_000 + i * 3));

    let built = build_and_save(&mut Cursor::new(&data), &index_path, &small_stride())?;
    let loaded = load(&index_path)?;
    assert_eq!(built, loaded);
    Ok(())
}
