mod builder_tests;

/// Renders raw-layout lines for `timestamps`, with axes derived from the
/// timestamp so every line is distinguishable.
pub(crate) fn raw_lines(timestamps: impl IntoIterator<Item = i64>) -> Vec<u8> {
    let mut out = Vec::new();
    for ts in timestamps {
        out.extend_from_slice(
            format!("{},{},{},{},0,0,0\n", ts, ts % 1000, -(ts % 777), ts % 13).as_bytes(),
        );
    }
    out
}
