//! Minimal comma-separated reading and writing.
//!
//! RFC 4180 quoting, which in practice only the free-text message field
//! ever needs.

use crate::parser::LogRecord;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

/// Header row of an exported record table, also required of CSV input
pub const RECORDS_HEADER: &str =
    "ip,timestamp,method,endpoint,http_version,status_code,size,message";

/// Quote a field if it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Split one CSV row into fields, honoring double-quoted fields with
/// doubled-quote escapes. A quote in the middle of an unquoted field is
/// taken literally.
pub fn split_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = row.chars().peekable();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
        } else {
            match c {
                '"' if field.is_empty() => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }
    }
    fields.push(field);
    fields
}

/// Render records as a headered CSV table, one row per record.
pub fn render_records(records: &[LogRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(RECORDS_HEADER);
    out.push('\n');
    for r in records {
        let method = r.method.to_string();
        let status = r.status_code.to_string();
        let fields = [
            r.ip.as_str(),
            r.timestamp.as_str(),
            method.as_str(),
            r.endpoint.as_str(),
            r.http_version.as_str(),
            status.as_str(),
            r.size.as_str(),
            r.message.as_str(),
        ];
        let row: Vec<Cow<'_, str>> = fields.iter().map(|f| escape_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Write the parsed records to `path` as a headered CSV table.
pub fn export_records(records: &[LogRecord], path: &Path) -> Result<(), io::Error> {
    fs::write(path, render_records(records))
}
