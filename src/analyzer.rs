use crate::parser::LogRecord;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Status code a server answers a rejected authentication attempt with.
const FAILED_LOGIN_STATUS: u16 = 401;
/// Marker the application writes into the message field on a rejected login.
/// Matched case-sensitively, anywhere in the message.
const FAILED_LOGIN_MARKER: &str = "Invalid credentials";

/// One row of the requests-per-IP report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRequests {
    pub ip: String,
    pub count: usize,
}

/// The single most frequently accessed endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointHit {
    pub endpoint: String,
    pub count: usize,
}

/// An IP whose failed-login count reached the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspiciousSource {
    pub ip: String,
    pub failed_logins: usize,
}

/// Errors from report computation, as opposed to per-line parse failures
#[derive(Debug, Error, PartialEq)]
pub enum AnalyzeError {
    /// The report needs at least one record and none were supplied
    #[error("no records to analyze")]
    EmptyInput,
}

/// The complete analysis output
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub total_records: usize,
    pub malformed_lines: usize,
    pub threshold: usize,
    pub request_counts: Vec<SourceRequests>,
    /// `None` only when there were no records to rank
    pub top_endpoint: Option<EndpointHit>,
    pub suspicious_sources: Vec<SuspiciousSource>,
}

/// Tally keys into (key, count) pairs, preserving first-seen order.
fn tally<'a, I>(keys: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut pairs: Vec<(&str, usize)> = Vec::new();
    for key in keys {
        match index.get(key) {
            Some(&i) => pairs[i].1 += 1,
            None => {
                index.insert(key, pairs.len());
                pairs.push((key, 1));
            }
        }
    }
    pairs
}

/// Count requests per source IP, most active first.
///
/// Only IPs with at least one record appear. Equal counts keep the order
/// the IPs were first seen in, so output is deterministic for a given input.
pub fn request_counts(records: &[LogRecord]) -> Vec<SourceRequests> {
    let mut pairs = tally(records.iter().map(|r| r.ip.as_str()));
    // stable sort: ties keep first-seen order
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    pairs
        .into_iter()
        .map(|(ip, count)| SourceRequests { ip: ip.to_string(), count })
        .collect()
}

/// Find the most frequently accessed endpoint.
///
/// Ties resolve to the endpoint seen first. With no records there is
/// nothing to rank and the caller gets [`AnalyzeError::EmptyInput`].
pub fn top_endpoint(records: &[LogRecord]) -> Result<EndpointHit, AnalyzeError> {
    let pairs = tally(records.iter().map(|r| r.endpoint.as_str()));
    let mut best: Option<(&str, usize)> = None;
    for (endpoint, count) in pairs {
        // strict comparison keeps the earliest endpoint on ties
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((endpoint, count));
        }
    }
    best.map(|(endpoint, count)| EndpointHit {
        endpoint: endpoint.to_string(),
        count,
    })
    .ok_or(AnalyzeError::EmptyInput)
}

/// Whether a record looks like a rejected login: a 401 response, or a
/// message carrying the failure marker.
pub fn is_failed_login(record: &LogRecord) -> bool {
    record.status_code == FAILED_LOGIN_STATUS || record.message.contains(FAILED_LOGIN_MARKER)
}

/// Report source IPs whose failed-login count is at least `threshold`,
/// worst offender first.
///
/// IPs below the threshold are absent entirely. Equal counts keep
/// first-seen order.
pub fn suspicious_sources(records: &[LogRecord], threshold: usize) -> Vec<SuspiciousSource> {
    let mut pairs = tally(
        records
            .iter()
            .filter(|r| is_failed_login(r))
            .map(|r| r.ip.as_str()),
    );
    pairs.retain(|&(_, count)| count >= threshold);
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    pairs
        .into_iter()
        .map(|(ip, failed_logins)| SuspiciousSource {
            ip: ip.to_string(),
            failed_logins,
        })
        .collect()
}

/// Run all three reports over the record set.
///
/// The reports are independent of each other; an empty record set leaves
/// `top_endpoint` unset without affecting the other two.
pub fn analyze(records: &[LogRecord], threshold: usize, malformed_lines: usize) -> AnalysisReport {
    AnalysisReport {
        total_records: records.len(),
        malformed_lines,
        threshold,
        request_counts: request_counts(records),
        top_endpoint: top_endpoint(records).ok(),
        suspicious_sources: suspicious_sources(records, threshold),
    }
}
