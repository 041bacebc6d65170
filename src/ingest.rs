//! File-to-records glue: turn an input file into a set of [`LogRecord`]s
//! plus the lines that had to be skipped.
//!
//! Two input shapes are accepted: the raw access log, and a record table
//! previously exported with [`crate::csv::export_records`] (or any CSV with
//! the same column header). Per-line failures never abort ingestion; an
//! unreadable file does.

use crate::csv::{split_row, RECORDS_HEADER};
use crate::parser::{self, LogRecord, ParseError};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort ingestion outright
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not read '{}': {source}", path.display())]
    SourceUnavailable { path: PathBuf, source: io::Error },
    #[error("'{}' is not a record table: missing the expected column header", path.display())]
    BadHeader { path: PathBuf },
}

/// Why a single line was skipped
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Malformed(#[from] ParseError),
    #[error("could not decode line: {0}")]
    Unreadable(#[from] io::Error),
}

/// A skipped input line, kept for diagnostics
#[derive(Debug)]
pub struct SkippedLine {
    pub line_no: usize,
    pub content: String,
    pub reason: SkipReason,
}

/// Everything ingested from one input file.
///
/// `records` empty with `skipped` non-empty means the file had lines but
/// none parsed; both empty means the file had no log lines at all.
#[derive(Debug)]
pub struct LoadedLog {
    pub records: Vec<LogRecord>,
    pub skipped: Vec<SkippedLine>,
}

/// Load records from `path`, treating `.csv` files as converted record
/// tables and anything else as a raw access log.
pub fn load(path: &Path) -> Result<LoadedLog, IngestError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => load_csv(path),
        _ => load_log(path),
    }
}

fn open(path: &Path) -> Result<BufReader<File>, IngestError> {
    File::open(path).map(BufReader::new).map_err(|source| {
        IngestError::SourceUnavailable { path: path.to_path_buf(), source }
    })
}

/// Read a raw access log, parsing line by line.
///
/// Blank lines are ignored; malformed lines are collected, not fatal.
pub fn load_log(path: &Path) -> Result<LoadedLog, IngestError> {
    let reader = open(path)?;
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                skipped.push(SkippedLine {
                    line_no,
                    content: String::new(),
                    reason: e.into(),
                });
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parser::parse_line(&line) {
            Ok(record) => records.push(record),
            Err(e) => skipped.push(SkippedLine {
                line_no,
                content: line,
                reason: e.into(),
            }),
        }
    }

    Ok(LoadedLog { records, skipped })
}

/// Read a record table: a CSV whose first non-blank line is exactly
/// [`RECORDS_HEADER`]. Rows that don't yield a record are skipped like
/// malformed log lines.
pub fn load_csv(path: &Path) -> Result<LoadedLog, IngestError> {
    let reader = open(path)?;
    let mut lines = reader.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, Ok(l))) if l.trim().is_empty() => continue,
            Some((_, Ok(l))) => break l,
            Some((_, Err(source))) => {
                return Err(IngestError::SourceUnavailable {
                    path: path.to_path_buf(),
                    source,
                })
            }
            None => return Err(IngestError::BadHeader { path: path.to_path_buf() }),
        }
    };
    if header.trim() != RECORDS_HEADER {
        return Err(IngestError::BadHeader { path: path.to_path_buf() });
    }

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for (idx, line_result) in lines {
        let line_no = idx + 1;
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                skipped.push(SkippedLine {
                    line_no,
                    content: String::new(),
                    reason: e.into(),
                });
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match record_from_row(&split_row(&line)) {
            Ok(record) => records.push(record),
            Err(e) => skipped.push(SkippedLine {
                line_no,
                content: line,
                reason: e.into(),
            }),
        }
    }

    Ok(LoadedLog { records, skipped })
}

fn record_from_row(fields: &[String]) -> Result<LogRecord, ParseError> {
    if fields.len() != 8 {
        return Err(ParseError::InvalidFormat(format!(
            "expected 8 comma-separated fields, found {}",
            fields.len()
        )));
    }
    let status_code = fields[5].parse::<u16>().map_err(|_| ParseError::InvalidField {
        field: "status_code",
        value: fields[5].clone(),
    })?;
    Ok(LogRecord {
        ip: fields[0].clone(),
        timestamp: fields[1].clone(),
        method: parser::parse_method(&fields[2]),
        endpoint: fields[3].clone(),
        http_version: fields[4].clone(),
        status_code,
        size: fields[6].clone(),
        message: fields[7].clone(),
    })
}
