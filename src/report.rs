//! Output formatting for blockextract results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::batch::BatchSummary;
use crate::dataset::to_pretty_json;
use crate::extract::{Block, ExtractError};
use crate::findings::{CountChange, CountDiff};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(OutputFormat::Pretty),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("invalid format {:?}, must be 'pretty' or 'json'", s)),
        }
    }
}

// =============================================================================
// Single extraction
// =============================================================================

/// JSON shape of a single extraction.
#[derive(Serialize)]
pub struct JsonExtraction {
    pub file: String,
    pub target_line: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonExtraction {
    pub fn new(file: &str, target_line: i64, outcome: &Result<Block, ExtractError>) -> Self {
        match outcome {
            Ok(block) => Self {
                file: file.to_string(),
                target_line,
                success: true,
                start_line: Some(block.start_line),
                end_line: Some(block.end_line),
                text: Some(block.text.clone()),
                error_kind: None,
                error: None,
            },
            Err(err) => Self {
                file: file.to_string(),
                target_line,
                success: false,
                start_line: None,
                end_line: None,
                text: None,
                error_kind: Some(err.kind().to_string()),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Write an extraction outcome.
pub fn write_extraction(
    format: OutputFormat,
    file: &str,
    target_line: i64,
    outcome: &Result<Block, ExtractError>,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = to_pretty_json(&JsonExtraction::new(file, target_line, outcome))?;
            println!("{}", json);
        }
        OutputFormat::Pretty => match outcome {
            Ok(block) => {
                eprintln!(
                    "{} {}:{}-{} ({} lines)",
                    "block".green().bold(),
                    file,
                    block.start_line,
                    block.end_line,
                    block.line_count()
                );
                let width = block.end_line.to_string().len();
                for (i, line) in block.text.lines().enumerate() {
                    let number = block.start_line + i;
                    let gutter = format!("{:>width$} |", number, width = width);
                    if number as i64 == target_line {
                        println!("{} {}", gutter.yellow().bold(), line);
                    } else {
                        println!("{} {}", gutter.dimmed(), line);
                    }
                }
            }
            Err(err) => {
                eprintln!(
                    "{} {}:{} [{}] {}",
                    "failed".red().bold(),
                    file,
                    target_line,
                    err.kind(),
                    err
                );
            }
        },
    }
    Ok(())
}

// =============================================================================
// Batch summary
// =============================================================================

#[derive(Serialize)]
struct JsonBatchSummary<'a> {
    version: &'static str,
    input: &'a str,
    output: &'a str,
    #[serde(flatten)]
    summary: &'a BatchSummary,
}

/// Write a batch summary.
pub fn write_batch_summary(
    format: OutputFormat,
    input: &str,
    output: &str,
    summary: &BatchSummary,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let report = JsonBatchSummary {
                version: env!("CARGO_PKG_VERSION"),
                input,
                output,
                summary,
            };
            println!("{}", to_pretty_json(&report)?);
        }
        OutputFormat::Pretty => {
            println!();
            print!("  ");
            print!("{}", "blockextract".cyan().bold());
            println!(" v{}", env!("CARGO_PKG_VERSION"));
            println!();

            print!("  {}", "Input:  ".dimmed());
            println!("{}", input);
            print!("  {}", "Output: ".dimmed());
            println!("{}", output);
            println!();

            println!("  {:<10} {}", "Rows".bold(), summary.total);
            println!("  {:<10} {}", "Extracted".green(), summary.succeeded);
            if summary.skipped > 0 {
                println!("  {:<10} {}", "Skipped".dimmed(), summary.skipped);
            }
            if summary.failed > 0 {
                println!("  {:<10} {}", "Failed".red(), summary.failed);
                for (kind, count) in &summary.failures {
                    println!("    {:<28} {}", kind.as_str().dimmed(), count);
                }
                println!();
                println!(
                    "  {} failure messages are in the output rows",
                    "note:".yellow()
                );
            }
            println!();
        }
    }
    Ok(())
}

// =============================================================================
// Findings
// =============================================================================

/// Write a finding-count mapping.
pub fn write_counts(format: OutputFormat, counts: &BTreeMap<String, usize>) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_pretty_json(counts)?),
        OutputFormat::Pretty => {
            if counts.is_empty() {
                println!("  {}", "no overlapping findings".dimmed());
                return Ok(());
            }
            let total: usize = counts.values().sum();
            for (check, count) in counts {
                println!("  {:<32} {}", check, count);
            }
            println!("  {:<32} {}", "total".bold(), total);
        }
    }
    Ok(())
}

/// Write a finding-count diff.
pub fn write_diff(format: OutputFormat, diff: &CountDiff) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_pretty_json(diff)?),
        OutputFormat::Pretty => {
            if diff.is_empty() {
                println!("  {}", "no differences".dimmed());
                return Ok(());
            }
            write_changes("+", &diff.added, |s: &str| s.green());
            write_changes("-", &diff.removed, |s: &str| s.red());
            write_changes("~", &diff.changed, |s: &str| s.yellow());
        }
    }
    Ok(())
}

fn write_changes(marker: &str, changes: &[CountChange], paint: fn(&str) -> ColoredString) {
    for c in changes {
        println!(
            "  {} {:<32} {} -> {}",
            paint(marker),
            c.check,
            c.before,
            c.after
        );
    }
}
