use clap::Parser;
use logtriage::{analyzer, csv, ingest, report};
use std::path::PathBuf;

/// A CLI tool that analyzes web server access logs for request volume,
/// hot endpoints and repeated failed logins
#[derive(Parser, Debug)]
#[command(
    name = "logtriage",
    author,
    version,
    about = "Analyzes access logs and reports traffic per IP, the hottest endpoint and brute-force suspects"
)]
struct Args {
    /// Path to the access log (or an exported .csv record table) to analyze
    #[arg(value_name = "LOG_FILE")]
    file: PathBuf,

    /// Failed-login count at which a source IP is reported as suspicious
    #[arg(short = 't', long = "threshold", value_name = "COUNT")]
    threshold: usize,

    /// Path of the sectioned results file
    #[arg(
        short = 'o',
        long = "output",
        default_value = "log_analysis_results.csv",
        value_name = "OUTPUT_FILE"
    )]
    output: PathBuf,

    /// Also export the parsed records as a headered CSV table
    #[arg(short = 'r', long = "records-csv", value_name = "RECORDS_FILE")]
    records_csv: Option<PathBuf>,

    /// Export the analysis as JSON to the specified file path
    #[arg(short = 'j', long = "json-output", value_name = "OUTPUT_FILE")]
    json_output: Option<PathBuf>,

    /// Suppress warnings for malformed log lines
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    // An unreadable source aborts the run; malformed lines never do
    let loaded = match ingest::load(&args.file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    if !args.quiet {
        for line in &loaded.skipped {
            eprintln!(
                "warning: skipped line {} — {}: {:?}",
                line.line_no,
                line.reason,
                truncate(&line.content, 80)
            );
        }
    }

    if loaded.records.is_empty() {
        if loaded.skipped.is_empty() {
            eprintln!("error: '{}' contains no log lines", args.file.display());
        } else {
            eprintln!(
                "error: no valid records in '{}' ({} malformed lines skipped)",
                args.file.display(),
                loaded.skipped.len()
            );
        }
        std::process::exit(1);
    }

    let analysis = analyzer::analyze(&loaded.records, args.threshold, loaded.skipped.len());

    report::print_report(&analysis, &args.file);

    match report::export_results(&analysis, &args.output) {
        Ok(_) => println!("Results saved to '{}'", args.output.display()),
        Err(e) => {
            eprintln!("error: failed to write results: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(path) = &args.records_csv {
        match csv::export_records(&loaded.records, path) {
            Ok(_) => println!("Parsed records saved to '{}'", path.display()),
            Err(e) => {
                eprintln!("error: failed to write record table: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(path) = &args.json_output {
        match report::export_json(&analysis, path) {
            Ok(_) => println!("JSON report saved to '{}'", path.display()),
            Err(e) => {
                eprintln!("error: failed to write JSON output: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Truncate to at most `max_chars` characters, on a character boundary.
fn truncate(line: &str, max_chars: usize) -> &str {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
