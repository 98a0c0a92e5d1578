//! # CLI - SeismoIndex Interactive Shell
//!
//! A REPL-style command-line interface over one sensor data file. Reads
//! commands from stdin, runs them against a [`SeismoReader`], and prints
//! results to stdout. Works both interactively and scripted (pipe commands
//! via stdin). Logs go to stderr.
//!
//! ## Commands
//!
//! ```text
//! INFO               Print file, layout, index origin and time range
//! QUERY start end    Print every sample with start < ts <= end (microseconds)
//! COUNT start end    Print the number of samples in the window
//! INDEX              Print the sparse index entries
//! EXIT / QUIT        Close the file and exit
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! SEISMO_DATA_PATH        data file                 (default: "seismodata.txt")
//! SEISMO_INDEX_STRIDE     index stride in bytes     (default: 2048)
//! SEISMO_INDEX_LOOKAHEAD  lookahead block in bytes  (default: 256)
//! SEISMO_CHUNK_KB         scan chunk size in KiB    (default: 1024)
//! SEISMO_ON_PARSE_ERROR   "abort" or "skip"         (default: "abort")
//! RUST_LOG                log filter                (default: "warn")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ SEISMO_DATA_PATH=seismodata.txt cargo run -p cli
//! SeismoIndex ready (path=seismodata.txt, layout=raw, entries=3, origin=built (missing))
//! > QUERY 1000 2000
//! 1970-01-01T00:00:00.002000Z 2000 11 21 31
//! (1 samples)
//! > EXIT
//! bye
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use config::ReaderConfig;
use reader::{BuildReason, IndexOrigin, SeismoReader, Window};
use std::io::{self, BufRead, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let data_path = env_or("SEISMO_DATA_PATH", "seismodata.txt");
    let config = ReaderConfig::from_env().context("invalid configuration")?;

    let mut reader = SeismoReader::open_with_config(&data_path, config)
        .with_context(|| format!("failed to open {data_path}"))?;
    info!(reader = ?reader, "shell started");

    println!(
        "SeismoIndex ready (path={}, layout={}, entries={}, origin={})",
        data_path,
        reader.layout(),
        reader.index().len(),
        describe_origin(reader.origin())
    );
    println!("Commands: INFO | QUERY start end | COUNT start end | INDEX | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "INFO" => print_info(&reader),
                "QUERY" => match parse_window(parts) {
                    Ok((start, end)) => match reader.get_data(start, end) {
                        Ok(window) => print_window(&window),
                        Err(e) => println!("ERR query failed: {}", e),
                    },
                    Err(e) => println!("ERR usage: QUERY start end ({})", e),
                },
                "COUNT" => match parse_window(parts) {
                    Ok((start, end)) => match reader.get_data(start, end) {
                        Ok(window) => println!("{} samples", window.len()),
                        Err(e) => println!("ERR query failed: {}", e),
                    },
                    Err(e) => println!("ERR usage: COUNT start end ({})", e),
                },
                "INDEX" => {
                    for e in reader.index().entries() {
                        println!("{} @ {}", e.timestamp, e.byte_offset);
                    }
                    println!("({} entries)", reader.index().len());
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    reader.close();
    Ok(())
}

/// Parses the two timestamp arguments of QUERY / COUNT.
fn parse_window<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<(i64, i64)> {
    let start = args.next().context("missing start")?;
    let end = args.next().context("missing end")?;
    if args.next().is_some() {
        anyhow::bail!("too many arguments");
    }
    let start = start.parse().with_context(|| format!("bad start {start:?}"))?;
    let end = end.parse().with_context(|| format!("bad end {end:?}"))?;
    Ok((start, end))
}

fn print_window(window: &Window) {
    if window.is_empty() {
        println!("(empty)");
    } else {
        for s in window.iter() {
            println!(
                "{} {} {} {} {}",
                s.time.to_rfc3339_opts(SecondsFormat::Micros, true),
                s.timestamp_us,
                s.x,
                s.y,
                s.z
            );
        }
        println!("({} samples)", window.len());
    }
    for f in &window.skipped {
        println!("skipped: {}", f);
    }
}

fn print_info(reader: &SeismoReader) {
    println!("path: {}", reader.path().display());
    println!("index: {}", reader.index_path().display());
    println!("layout: {}", reader.layout());
    println!("origin: {}", describe_origin(reader.origin()));
    println!("entries: {}", reader.index().len());
    println!("start: {} ({})", reader.start_time(), calendar(reader.start_time()));
    println!("end: {} ({})", reader.end_time(), calendar(reader.end_time()));
}

fn describe_origin(origin: IndexOrigin) -> &'static str {
    match origin {
        IndexOrigin::Loaded => "loaded",
        IndexOrigin::Built(BuildReason::Missing) => "built (missing)",
        IndexOrigin::Built(BuildReason::Stale) => "built (stale)",
        IndexOrigin::Built(BuildReason::Corrupt) => "built (corrupt)",
    }
}

fn calendar(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(ts)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| "out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_window_accepts_two_integers() {
        assert_eq!(parse_window("1000 2000".split_whitespace()).unwrap(), (1000, 2000));
        assert_eq!(parse_window("-5 5".split_whitespace()).unwrap(), (-5, 5));
    }

    #[test]
    fn parse_window_rejects_bad_arguments() {
        assert!(parse_window("".split_whitespace()).is_err());
        assert!(parse_window("1000".split_whitespace()).is_err());
        assert!(parse_window("1000 abc".split_whitespace()).is_err());
        assert!(parse_window("1 2 3".split_whitespace()).is_err());
    }

    #[test]
    fn calendar_formats_micros() {
        assert_eq!(calendar(2000), "1970-01-01T00:00:00.002000Z");
        assert_eq!(calendar(i64::MAX), "out of range");
    }

    #[test]
    fn origins_are_described() {
        assert_eq!(describe_origin(IndexOrigin::Loaded), "loaded");
        assert_eq!(describe_origin(IndexOrigin::Built(BuildReason::Stale)), "built (stale)");
    }
}
