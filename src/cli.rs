//! Command-line interface for blockextract.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::batch::BatchRunner;
use crate::config::{self, BatchConfig, LocateMode, SkipRule};
use crate::dataset;
use crate::extract::extract;
use crate::filter::{self, RowFilter};
use crate::findings::{self, Report};
use crate::report::{self, OutputFormat};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Source-block extractor for mutation-testing pipelines.
///
/// Locates the function, modifier, constructor, receive or fallback block
/// enclosing a line of source, and runs that extraction over datasets of
/// mutation results.
#[derive(Parser)]
#[command(name = "blockextract")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the block enclosing a line of a source file
    Extract(ExtractArgs),
    /// Extract blocks for every row of a dataset
    Batch(BatchArgs),
    /// Filter a dataset by column values
    Select(SelectArgs),
    /// Overwrite a column on rows matching a condition
    Mark(MarkArgs),
    /// Convert a dataset between JSON and JSON Lines
    Convert(ConvertArgs),
    /// Count analyzer findings overlapping a line range
    Findings(FindingsArgs),
    /// Compare two finding-count mappings
    Diff(DiffArgs),
}

/// Arguments for the extract command.
#[derive(Parser)]
pub struct ExtractArgs {
    /// Source file
    pub file: PathBuf,

    /// 1-based line inside the wanted block
    #[arg(allow_negative_numbers = true)]
    pub line: i64,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the batch command.
#[derive(Parser)]
pub struct BatchArgs {
    /// Input dataset (.json or .jsonl)
    pub input: PathBuf,

    /// Output dataset (.json or .jsonl)
    pub output: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How rows name their source file: path or hash
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Directory of source files searched in hash mode
    #[arg(long)]
    pub contracts_dir: Option<PathBuf>,

    /// Base directory for relative paths in path mode
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Keep only rows where COLUMN is one of the values (repeatable)
    #[arg(long, value_name = "COLUMN=V1,V2")]
    pub filter: Vec<String>,

    /// Process at most this many rows after filtering
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Column receiving the extracted block
    #[arg(long)]
    pub output_column: Option<String>,

    /// Skip extraction on rows where COLUMN is one of the values
    #[arg(long, value_name = "COLUMN=V1,V2")]
    pub skip: Option<String>,

    /// Value written to skipped rows
    #[arg(long, default_value = "N/A")]
    pub skip_value: String,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Summary format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the select command.
#[derive(Parser)]
pub struct SelectArgs {
    pub input: PathBuf,
    pub output: PathBuf,

    /// Keep only rows where COLUMN is one of the values (repeatable)
    #[arg(long, value_name = "COLUMN=V1,V2")]
    pub filter: Vec<String>,

    /// Keep at most this many rows after filtering
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the mark command.
#[derive(Parser)]
pub struct MarkArgs {
    /// Dataset to modify
    pub input: PathBuf,

    /// Write here instead of modifying the input in place
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Condition selecting the rows to mark
    #[arg(long, value_name = "COLUMN=V1,V2")]
    pub when: String,

    /// Column to overwrite
    #[arg(long)]
    pub column: String,

    /// Value to write
    #[arg(long, default_value = "N/A")]
    pub value: String,
}

/// Arguments for the convert command.
#[derive(Parser)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Arguments for the findings command.
#[derive(Parser)]
pub struct FindingsArgs {
    /// Analyzer JSON report
    pub report: PathBuf,

    /// First line of the range (inclusive)
    #[arg(long)]
    pub start: usize,

    /// Last line of the range (inclusive)
    #[arg(long)]
    pub end: usize,

    /// Only count elements whose file name ends with this suffix
    #[arg(long)]
    pub file: Option<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the diff command.
#[derive(Parser)]
pub struct DiffArgs {
    /// Counts before the mutation (JSON object)
    pub before: PathBuf,

    /// Counts after the mutation (JSON object)
    pub after: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Set up logging to stderr. `RUST_LOG` overrides the verbosity flag.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("blockextract={}", level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_format(format: &str) -> Option<OutputFormat> {
    match format.parse() {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn parse_filters(exprs: &[String]) -> anyhow::Result<RowFilter> {
    exprs
        .iter()
        .try_fold(RowFilter::new(), |acc, expr| -> anyhow::Result<RowFilter> {
            Ok(acc.merge(filter::parse_filter(expr)?))
        })
}

/// Run the extract command.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", args.file.display(), e);
            return Ok(EXIT_ERROR);
        }
    };

    let outcome = extract(&source, args.line);
    let file = args.file.to_string_lossy();
    report::write_extraction(format, &file, args.line, &outcome)?;

    if outcome.is_ok() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Load the batch config from an explicit path, a discovered file, or defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<BatchConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => config::discover(Path::new(".")),
    };

    match path {
        Some(p) => {
            tracing::info!("using config {}", p.display());
            BatchConfig::parse_file(&p)
                .map_err(|e| anyhow::anyhow!("parsing config {}: {}", p.display(), e))
        }
        None => Ok(BatchConfig::default()),
    }
}

/// Layer CLI flags over a loaded config.
fn apply_overrides(mut config: BatchConfig, args: &BatchArgs) -> anyhow::Result<BatchConfig> {
    if let Some(mode) = &args.mode {
        config.mode = mode.parse::<LocateMode>().map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(dir) = &args.contracts_dir {
        config.contracts_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.base_dir {
        config.base_dir = Some(dir.clone());
    }
    if !args.filter.is_empty() {
        config.filters = config.filters.override_with(parse_filters(&args.filter)?);
    }
    if let Some(limit) = args.limit {
        config.limit = Some(limit);
    }
    if let Some(column) = &args.output_column {
        config.output_column = column.clone();
    }
    if let Some(expr) = &args.skip {
        let (column, values) = filter::parse_condition(expr)?;
        config.skip = Some(SkipRule {
            column,
            values,
            value: args.skip_value.clone(),
        });
    }
    Ok(config)
}

/// Run the batch command.
pub fn run_batch(args: &BatchArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };

    let config = match load_config(args.config.as_deref()).and_then(|c| apply_overrides(c, args)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Err(e) = config::validate(&config) {
        eprintln!("Error: invalid config: {}", e);
        return Ok(EXIT_ERROR);
    }

    let records = match dataset::read_records(&args.input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if records.is_empty() {
        eprintln!("Warning: no rows to process");
    }

    let runner = BatchRunner::new(config)?.show_progress(!args.no_progress);
    let result = runner.run(records);
    dataset::write_records(&args.output, &result.records)?;

    report::write_batch_summary(
        format,
        &args.input.to_string_lossy(),
        &args.output.to_string_lossy(),
        &result.summary,
    )?;

    Ok(EXIT_SUCCESS)
}

/// Run the select command.
pub fn run_select(args: &SelectArgs) -> anyhow::Result<i32> {
    let filter = parse_filters(&args.filter)?;
    let records = dataset::read_records(&args.input)?;
    let selected = filter::select(records, &filter, args.limit);
    dataset::write_records(&args.output, &selected)?;
    println!("Wrote {} rows to {}", selected.len(), args.output.display());
    Ok(EXIT_SUCCESS)
}

/// Run the mark command.
pub fn run_mark(args: &MarkArgs) -> anyhow::Result<i32> {
    let (column, values) = filter::parse_condition(&args.when)?;
    let mut records = dataset::read_records(&args.input)?;
    let changed = filter::override_column(&mut records, &column, &values, &args.column, &args.value);

    let output = args.output.as_ref().unwrap_or(&args.input);
    dataset::write_records(output, &records)?;
    println!(
        "Set {} = {:?} on {} of {} rows in {}",
        args.column,
        args.value,
        changed,
        records.len(),
        output.display()
    );
    Ok(EXIT_SUCCESS)
}

/// Run the convert command.
pub fn run_convert(args: &ConvertArgs) -> anyhow::Result<i32> {
    let count = dataset::convert(&args.input, &args.output)?;
    println!("Converted {} rows to {}", count, args.output.display());
    Ok(EXIT_SUCCESS)
}

/// Run the findings command.
pub fn run_findings(args: &FindingsArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };
    if args.start > args.end {
        eprintln!(
            "Error: --start ({}) must not exceed --end ({})",
            args.start, args.end
        );
        return Ok(EXIT_ERROR);
    }

    let report = Report::parse_file(&args.report)?;
    let counts = findings::count_overlapping(&report, args.start, args.end, args.file.as_deref());
    report::write_counts(format, &counts)?;
    Ok(EXIT_SUCCESS)
}

/// Run the diff command.
pub fn run_diff(args: &DiffArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };

    let before = findings::read_counts(&args.before)?;
    let after = findings::read_counts(&args.after)?;
    report::write_diff(format, &findings::diff_counts(&before, &after))?;
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_args(extra: &[&str]) -> BatchArgs {
        let mut argv = vec!["blockextract", "batch", "in.json", "out.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Batch(args) => args,
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_cli_parses_negative_line() {
        let cli = Cli::parse_from(["blockextract", "extract", "A.sol", "-1"]);
        match cli.command {
            Commands::Extract(args) => assert_eq!(args.line, -1),
            _ => panic!("expected extract command"),
        }
    }

    #[test]
    fn test_overrides_layer_on_config() {
        let base = BatchConfig::parse("limit: 10\nfilters:\n  Operator: [UTR]\n").unwrap();
        let args = batch_args(&[
            "--mode",
            "hash",
            "--contracts-dir",
            "mutants",
            "--filter",
            "Status=killed",
            "--skip",
            "Operator=LE",
            "--output-column",
            "ExtractedFunctionMutation",
            "--no-progress",
        ]);

        let config = apply_overrides(base, &args).unwrap();
        assert_eq!(config.mode, LocateMode::Hash);
        assert_eq!(config.contracts_dir, Some(PathBuf::from("mutants")));
        assert_eq!(config.limit, Some(10));
        assert_eq!(
            config.filters,
            RowFilter::new()
                .allow("Operator", ["UTR"])
                .allow("Status", ["killed"])
        );
        assert_eq!(config.output_column, "ExtractedFunctionMutation");

        let skip = config.skip.unwrap();
        assert_eq!(skip.column, "Operator");
        assert_eq!(skip.values, vec!["LE".to_string()]);
        assert_eq!(skip.value, "N/A");
    }

    #[test]
    fn test_cli_filter_narrows_config_filter() {
        let base = BatchConfig::parse("filters:\n  Operator: [UTR]\n").unwrap();
        let args = batch_args(&["--filter", "Operator=LE", "--filter", "Operator=TD"]);
        let config = apply_overrides(base, &args).unwrap();

        let rows: Vec<dataset::Record> = serde_json::from_value(serde_json::json!([
            {"Operator": "UTR"},
            {"Operator": "LE"},
            {"Operator": "TD"}
        ]))
        .unwrap();
        let selected = filter::select(rows, &config.filters, None);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|r| r["Operator"] != "UTR"));
    }

    #[test]
    fn test_overrides_reject_unknown_mode() {
        let args = batch_args(&["--mode", "glob"]);
        assert!(apply_overrides(BatchConfig::default(), &args).is_err());
    }
}
