use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Minimum number of whitespace-separated fields in a well-formed line:
/// ip, ident, user, the two timestamp halves, method, endpoint, protocol,
/// status and size. Anything past those is the free-text message.
pub const MIN_FIELDS: usize = 10;

/// One parsed request event from the access log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub ip: String,
    pub timestamp: String,
    pub method: HttpMethod,
    pub endpoint: String,
    pub http_version: String,
    pub status_code: u16,
    /// Response size as written in the log; servers log `-` for bodiless
    /// responses, so this stays an opaque token.
    pub size: String,
    /// Free-text remainder of the line, empty when absent
    pub message: String,
}

/// HTTP methods
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Other(String),
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Delete => write!(f, "DELETE"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Head => write!(f, "HEAD"),
            HttpMethod::Options => write!(f, "OPTIONS"),
            HttpMethod::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Errors that can occur while parsing a single log line.
///
/// Every variant means the same thing to the pipeline: the line is skipped
/// and processing continues.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// The line has too few whitespace-separated fields to hold a request
    #[error("expected at least 10 whitespace-separated fields, found {found}")]
    TooFewTokens { found: usize },
    /// The line has enough fields but doesn't match the expected layout
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// A field was present but couldn't be converted
    #[error("invalid value for field '{field}': '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// Expected line layout (Apache common log with an optional trailing message):
///
///   IP IDENT USER [DATE ZONE] "METHOD ENDPOINT PROTOCOL" STATUS SIZE MESSAGE...
///
/// Example:
///   203.0.113.7 - - [10/Oct/2023:13:55:36 -0700] "GET /home HTTP/1.1" 200 512
static LINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn line_regex() -> &'static Regex {
    LINE_REGEX.get_or_init(|| {
        Regex::new(
            r#"^(?P<ip>\S+)\s+\S+\s+\S+\s+\[(?P<date>[^\]\s]+)\s+(?P<zone>[^\]\s]+)\]\s+"(?P<method>[^"\s]+)\s+(?P<endpoint>\S+)\s+(?P<version>[^"\s]+)"\s+(?P<status>\d{3})\s+(?P<size>\S+)(?:\s+(?P<message>\S.*?))?\s*$"#,
        )
        .expect("hard-coded regex should always compile")
    })
}

/// Parse a single access log line into a structured [`LogRecord`].
///
/// The field count is checked first, then the line must match the bracketed
/// timestamp / quoted request layout above. Lines that have enough fields
/// but the wrong shape are rejected rather than mis-fielded.
pub fn parse_line(line: &str) -> Result<LogRecord, ParseError> {
    let line = line.trim();

    let found = line.split_whitespace().count();
    if found < MIN_FIELDS {
        return Err(ParseError::TooFewTokens { found });
    }

    let caps = line_regex().captures(line).ok_or_else(|| {
        ParseError::InvalidFormat(format!(
            "line does not match the access log layout: {:?}",
            snippet(line, 100)
        ))
    })?;

    let status_str = &caps["status"];
    let status_code = status_str.parse::<u16>().map_err(|_| ParseError::InvalidField {
        field: "status_code",
        value: status_str.to_string(),
    })?;

    // Runs of whitespace inside the message collapse to single spaces,
    // mirroring the field tokenization.
    let message = caps
        .name("message")
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    Ok(LogRecord {
        ip: caps["ip"].to_string(),
        timestamp: format!("{} {}", &caps["date"], &caps["zone"]),
        method: parse_method(&caps["method"]),
        endpoint: caps["endpoint"].to_string(),
        http_version: caps["version"].to_string(),
        status_code,
        size: caps["size"].to_string(),
        message,
    })
}

/// Map a verb token onto [`HttpMethod`]; unknown verbs are kept verbatim.
pub fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        "PATCH" => HttpMethod::Patch,
        "HEAD" => HttpMethod::Head,
        "OPTIONS" => HttpMethod::Options,
        other => HttpMethod::Other(other.to_string()),
    }
}

fn snippet(line: &str, max_chars: usize) -> &str {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

// ─── Unit Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_line() -> &'static str {
        "203.0.113.7 - - [10/Oct/2023:13:55:36 -0700] \"GET /home HTTP/1.1\" 200 512"
    }

    #[test]
    fn parses_valid_line() {
        let record = parse_line(valid_line()).expect("should parse valid line");
        assert_eq!(record.ip, "203.0.113.7");
        assert_eq!(record.timestamp, "10/Oct/2023:13:55:36 -0700");
        assert_eq!(record.method, HttpMethod::Get);
        assert_eq!(record.endpoint, "/home");
        assert_eq!(record.http_version, "HTTP/1.1");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.size, "512");
        assert_eq!(record.message, "");
    }

    #[test]
    fn parses_trailing_message() {
        let line =
            "1.1.1.1 - - [10/Oct/2023:13:55:36 -0700] \"GET /home HTTP/1.1\" 401 512 Invalid credentials";
        let record = parse_line(line).unwrap();
        assert_eq!(record.status_code, 401);
        assert_eq!(record.message, "Invalid credentials");
    }

    #[test]
    fn message_whitespace_collapses_to_single_spaces() {
        let line =
            "1.1.1.1 - - [10/Oct/2023:13:55:36 -0700] \"GET /home HTTP/1.1\" 401 512 Invalid   credentials   again";
        let record = parse_line(line).unwrap();
        assert_eq!(record.message, "Invalid credentials again");
    }

    #[test]
    fn parses_all_http_methods() {
        let methods = vec![
            ("GET", HttpMethod::Get),
            ("POST", HttpMethod::Post),
            ("PUT", HttpMethod::Put),
            ("DELETE", HttpMethod::Delete),
            ("PATCH", HttpMethod::Patch),
            ("HEAD", HttpMethod::Head),
            ("OPTIONS", HttpMethod::Options),
        ];
        for (method_str, expected) in methods {
            let line = format!(
                "1.2.3.4 - - [10/Oct/2023:13:55:36 -0700] \"{} /path HTTP/1.1\" 200 128",
                method_str
            );
            let record = parse_line(&line).unwrap();
            assert_eq!(record.method, expected, "failed for method {}", method_str);
        }
    }

    #[test]
    fn unknown_method_kept_verbatim() {
        let line = "1.2.3.4 - - [10/Oct/2023:13:55:36 -0700] \"TRACE /path HTTP/1.1\" 200 128";
        let record = parse_line(line).unwrap();
        assert_eq!(record.method, HttpMethod::Other("TRACE".into()));
    }

    #[test]
    fn dash_size_kept_as_opaque_token() {
        let line = "1.2.3.4 - - [10/Oct/2023:13:55:36 -0700] \"HEAD /path HTTP/1.1\" 304 -";
        let record = parse_line(line).unwrap();
        assert_eq!(record.size, "-");
    }

    #[test]
    fn rejects_too_few_tokens() {
        let incomplete = "1.2.3.4 - - [10/Oct/2023:13:55:36 -0700] \"GET /path\" 200";
        match parse_line(incomplete) {
            Err(ParseError::TooFewTokens { found }) => assert_eq!(found, 8),
            other => panic!("expected TooFewTokens, got {:?}", other),
        }
    }

    #[test]
    fn rejects_empty_line() {
        assert_eq!(parse_line(""), Err(ParseError::TooFewTokens { found: 0 }));
        assert_eq!(parse_line("   "), Err(ParseError::TooFewTokens { found: 0 }));
    }

    #[test]
    fn rejects_missing_timestamp_brackets() {
        // Ten fields, but the timestamp is not bracket-delimited
        let line = "1.2.3.4 - - 10/Oct/2023:13:55:36 -0700 \"GET /path HTTP/1.1\" 200 512";
        assert!(matches!(parse_line(line), Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_unquoted_request() {
        let line = "1.2.3.4 - - [10/Oct/2023:13:55:36 -0700] GET /path HTTP/1.1 200 512 extra";
        assert!(matches!(parse_line(line), Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_non_numeric_status() {
        // The regex only matches 3 digits so this won't match
        let line = "1.2.3.4 - - [10/Oct/2023:13:55:36 -0700] \"GET /path HTTP/1.1\" abc 512";
        assert!(parse_line(line).is_err());
    }

    #[test]
    fn handles_trailing_whitespace() {
        let line = "203.0.113.7 - - [10/Oct/2023:13:55:36 -0700] \"GET /home HTTP/1.1\" 200 512   ";
        let record = parse_line(line).expect("should handle trailing whitespace");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.message, "");
    }

    #[test]
    fn http_method_display() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Other("TRACE".into()).to_string(), "TRACE");
    }
}
