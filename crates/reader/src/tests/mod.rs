
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

/// One raw-layout line whose axes are derived from `ts`, so the axis width
/// (and therefore the line length) varies from line to line.
pub(crate) fn raw_line(ts: i64) -> String {
    format!("{},{},{},{},0,0,0\n", ts, ts % 1000, -(ts % 777), ts % 13)
}

pub(crate) fn write_raw(path: &Path, timestamps: impl IntoIterator<Item = i64>) -> std::io::Result<()> {
    let body: String = timestamps.into_iter().map(raw_line).collect();
    fs::write(path, body)
}

pub(crate) fn append(path: &Path, text: &str) -> std::io::Result<()> {
    let mut f = File::options().append(true).open(path)?;
    f.write_all(text.as_bytes())
}

pub(crate) fn set_mtime(path: &Path, when: SystemTime) -> std::io::Result<()> {
    File::options().write(true).open(path)?.set_modified(when)
}
