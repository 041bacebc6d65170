use crate::analyzer::AnalysisReport;
use crate::csv::escape_field;
use chrono::Local;
use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;

const SEPARATOR: &str =
    "════════════════════════════════════════════════════════════════════";
const THIN_SEP: &str =
    "────────────────────────────────────────────────────────────────────";

// Literal section labels in the results file; downstream tooling greps
// for these, so they are not localized or reworded.
const REQUESTS_SECTION: &str = "Requests per IP Address";
const ENDPOINT_SECTION: &str = "Most Frequently Accessed Endpoint";
const SUSPICIOUS_SECTION: &str = "Suspicious Activity Detected";
const NO_SUSPICIOUS_ROW: &str = "No suspicious activity detected";

/// Print a fully formatted analysis report to stdout
pub fn print_report(report: &AnalysisReport, source_file: &Path) {
    println!("\n{}", SEPARATOR.cyan().bold());
    println!("{}", "  📋  ACCESS LOG REPORT".white().bold());
    println!("{}", SEPARATOR.cyan().bold());
    println!("  Source    : {}", source_file.display().to_string().yellow());
    println!("  Generated : {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!();

    // ── Overview ──────────────────────────────────────────────────────────────
    section_header("OVERVIEW");
    println!(
        "  {:<28} {}",
        "Records parsed:",
        report.total_records.to_string().green().bold()
    );
    println!(
        "  {:<28} {}",
        "Malformed / skipped lines:",
        if report.malformed_lines > 0 {
            report.malformed_lines.to_string().yellow().bold()
        } else {
            "0".normal()
        }
    );
    println!("  {:<28} {}", "Failed-login threshold:", report.threshold);
    println!();

    // ── Requests per IP ───────────────────────────────────────────────────────
    section_header("REQUESTS PER IP ADDRESS");
    if report.request_counts.is_empty() {
        println!("  (no data)");
    } else {
        println!(
            "  {:<3}  {:<17}  {:>8}  {:>8}",
            "#", "IP Address", "Requests", "Share"
        );
        println!("  {}", &THIN_SEP[..54]);
        for (i, item) in report.request_counts.iter().enumerate() {
            println!(
                "  {:<3}  {:<17}  {:>8}  {:>7.2}%",
                (i + 1).to_string().dimmed(),
                item.ip.cyan(),
                item.count,
                pct(item.count, report.total_records)
            );
        }
    }
    println!();

    // ── Top endpoint ──────────────────────────────────────────────────────────
    section_header("MOST FREQUENTLY ACCESSED ENDPOINT");
    match &report.top_endpoint {
        Some(hit) => println!(
            "  {}  (accessed {} times)",
            hit.endpoint.cyan().bold(),
            hit.count.to_string().green()
        ),
        None => println!("  (no data)"),
    }
    println!();

    // ── Suspicious activity ───────────────────────────────────────────────────
    section_header(&format!(
        "SUSPICIOUS ACTIVITY — FAILED LOGINS ≥ {}",
        report.threshold
    ));
    if report.suspicious_sources.is_empty() {
        println!("  {} {}.", "✓".green(), NO_SUSPICIOUS_ROW);
    } else {
        println!(
            "  {} source IPs flagged!\n",
            report.suspicious_sources.len().to_string().red().bold()
        );
        println!("  {:<3}  {:<17}  {:>14}", "#", "IP Address", "Failed Logins");
        println!("  {}", &THIN_SEP[..42]);
        for (i, item) in report.suspicious_sources.iter().enumerate() {
            println!(
                "  {:<3}  {:<17}  {:>14}",
                (i + 1).to_string().dimmed(),
                item.ip.red().bold(),
                item.failed_logins.to_string().red()
            );
        }
    }

    println!("\n{}\n", SEPARATOR.cyan());
}

/// Render the results file: three labeled sections with per-section column
/// headers, blank lines in between, and a placeholder row when nothing
/// suspicious was found.
pub fn render_results(report: &AnalysisReport) -> String {
    let mut out = String::new();

    out.push_str(REQUESTS_SECTION);
    out.push('\n');
    out.push_str("IP Address,Request Count\n");
    for row in &report.request_counts {
        out.push_str(&format!("{},{}\n", escape_field(&row.ip), row.count));
    }
    out.push('\n');

    out.push_str(ENDPOINT_SECTION);
    out.push('\n');
    out.push_str("Endpoint,Access Count\n");
    if let Some(hit) = &report.top_endpoint {
        out.push_str(&format!("{},{}\n", escape_field(&hit.endpoint), hit.count));
    }
    out.push('\n');

    out.push_str(SUSPICIOUS_SECTION);
    out.push('\n');
    if report.suspicious_sources.is_empty() {
        out.push_str(NO_SUSPICIOUS_ROW);
        out.push('\n');
    } else {
        out.push_str("IP Address,Failed Login Count\n");
        for row in &report.suspicious_sources {
            out.push_str(&format!("{},{}\n", escape_field(&row.ip), row.failed_logins));
        }
    }

    out
}

/// Write the sectioned results file to the given path
pub fn export_results(report: &AnalysisReport, path: &Path) -> Result<(), io::Error> {
    fs::write(path, render_results(report))
}

/// Export the analysis as JSON to the given path
pub fn export_json(report: &AnalysisReport, path: &Path) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(report).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("serialization failed: {}", e))
    })?;
    fs::write(path, json)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn section_header(title: &str) {
    println!("  {} {}", "▶".cyan(), title.white().bold());
    println!("  {}", THIN_SEP);
}

fn pct(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (n as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisReport, EndpointHit, SourceRequests, SuspiciousSource};

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            total_records: 3,
            malformed_lines: 1,
            threshold: 1,
            request_counts: vec![
                SourceRequests { ip: "1.1.1.1".into(), count: 2 },
                SourceRequests { ip: "2.2.2.2".into(), count: 1 },
            ],
            top_endpoint: Some(EndpointHit { endpoint: "/home".into(), count: 2 }),
            suspicious_sources: vec![SuspiciousSource {
                ip: "2.2.2.2".into(),
                failed_logins: 1,
            }],
        }
    }

    #[test]
    fn results_sections_appear_in_order() {
        let rendered = render_results(&sample_report());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Requests per IP Address",
                "IP Address,Request Count",
                "1.1.1.1,2",
                "2.2.2.2,1",
                "",
                "Most Frequently Accessed Endpoint",
                "Endpoint,Access Count",
                "/home,2",
                "",
                "Suspicious Activity Detected",
                "IP Address,Failed Login Count",
                "2.2.2.2,1",
            ]
        );
    }

    #[test]
    fn empty_suspicious_list_renders_placeholder_row() {
        let mut report = sample_report();
        report.suspicious_sources.clear();
        let rendered = render_results(&report);
        assert!(rendered.ends_with("Suspicious Activity Detected\nNo suspicious activity detected\n"));
        assert!(!rendered.contains("Failed Login Count"));
    }

    #[test]
    fn endpoint_with_comma_is_quoted() {
        let mut report = sample_report();
        report.top_endpoint = Some(EndpointHit { endpoint: "/a,b".into(), count: 2 });
        let rendered = render_results(&report);
        assert!(rendered.contains("\"/a,b\",2\n"));
    }
}
