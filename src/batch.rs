//! Batch extraction over dataset rows.
//!
//! Each row names a source file (by path or by hash) and a start line. The
//! runner resolves the file, extracts the enclosing block and writes the
//! result back into the row. Failures stay inside their row: the failure
//! message replaces the block text and the batch carries on.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{BatchConfig, LocateMode};
use crate::dataset::{cell_str, Record};
use crate::extract::{extract, Block, ExtractError};
use crate::filter::select_indexed;
use crate::locate::SourceLocator;

/// Status written for rows that extracted cleanly.
pub const STATUS_SUCCESS: &str = "success";
/// Status written for rows matched by the skip rule.
pub const STATUS_SKIPPED: &str = "skipped";

/// Row-level failures, including those raised before extraction.
#[derive(Error, Debug)]
pub enum RowError {
    #[error("missing value in column {column:?}")]
    MissingColumn { column: String },

    #[error("start line {value:?} is not a valid integer")]
    InvalidLine { value: String },

    #[error("start line must be positive ({line})")]
    NonPositiveLine { line: i64 },

    #[error("no .{extension} file under {dir} has a name containing {hash:?}")]
    NoHashMatch {
        hash: String,
        dir: String,
        extension: String,
    },

    #[error("source file not found: {path}")]
    SourceNotFound { path: String },

    #[error("path is not a file: {path}")]
    NotAFile { path: String },

    #[error("reading {path}: {message}")]
    Read { path: String, message: String },

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

impl RowError {
    /// Stable name for this failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::MissingColumn { .. } => "missing_column",
            RowError::InvalidLine { .. } => "invalid_line",
            RowError::NonPositiveLine { .. } => "non_positive_line",
            RowError::NoHashMatch { .. } => "no_hash_match",
            RowError::SourceNotFound { .. } => "source_not_found",
            RowError::NotAFile { .. } => "not_a_file",
            RowError::Read { .. } => "read_error",
            RowError::Extract(e) => e.kind(),
        }
    }
}

/// What happened to one row.
#[derive(Debug)]
pub enum RowOutcome {
    Extracted(Block),
    Skipped,
    Failed(RowError),
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Failure count per kind
    pub failures: BTreeMap<String, usize>,
}

impl BatchSummary {
    fn record(&mut self, outcome: &RowOutcome) {
        self.total += 1;
        match outcome {
            RowOutcome::Extracted(_) => self.succeeded += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Failed(err) => {
                self.failed += 1;
                *self.failures.entry(err.kind().to_string()).or_insert(0) += 1;
            }
        }
    }
}

/// Output of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Annotated rows, in input order
    pub records: Vec<Record>,
    pub summary: BatchSummary,
}

/// Runs extraction over every selected row of a dataset.
pub struct BatchRunner {
    config: BatchConfig,
    locator: SourceLocator,
    show_progress: bool,
}

impl BatchRunner {
    /// Create a runner. In hash mode the contracts directory is indexed here.
    pub fn new(config: BatchConfig) -> anyhow::Result<Self> {
        let locator = match config.mode {
            LocateMode::Path => SourceLocator::by_path(config.base_dir.clone()),
            LocateMode::Hash => {
                let dir = config
                    .contracts_dir
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("hash mode requires contracts_dir"))?;
                SourceLocator::by_hash(dir, &config.extension, &config.exclude)?
            }
        };
        Ok(Self {
            config,
            locator,
            show_progress: false,
        })
    }

    /// Set whether to draw a progress bar.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Filter, limit and process the given rows.
    pub fn run(&self, records: Vec<Record>) -> BatchResult {
        let selected = select_indexed(records, &self.config.filters, self.config.limit);
        let progress = self.progress_bar(selected.len() as u64);

        tracing::info!(
            "extracting blocks for {} rows ({} mode)",
            selected.len(),
            self.config.mode
        );

        let processed: Vec<(Record, RowOutcome)> = selected
            .into_par_iter()
            .map(|(position, record)| {
                let row = self.process_row(position + 1, record);
                progress.inc(1);
                row
            })
            .collect();
        progress.finish_and_clear();

        let mut result = BatchResult::default();
        for (record, outcome) in processed {
            result.summary.record(&outcome);
            result.records.push(record);
        }

        tracing::info!(
            "batch complete: {} rows, {} succeeded, {} failed, {} skipped",
            result.summary.total,
            result.summary.succeeded,
            result.summary.failed,
            result.summary.skipped
        );
        result
    }

    /// Process a single row. `row_number` is the 1-based position of the
    /// record in the input dataset, before filtering, and appears in
    /// failure messages.
    pub fn process_row(&self, row_number: usize, mut record: Record) -> (Record, RowOutcome) {
        let outcome = if self.is_skipped(&record) {
            RowOutcome::Skipped
        } else {
            match self.extract_row(&record) {
                Ok(block) => RowOutcome::Extracted(block),
                Err(err) => {
                    tracing::warn!("row {}: {}", row_number, err);
                    RowOutcome::Failed(err)
                }
            }
        };

        self.annotate(&mut record, row_number, &outcome);
        (record, outcome)
    }

    fn is_skipped(&self, record: &Record) -> bool {
        self.config
            .skip
            .as_ref()
            .and_then(|rule| {
                cell_str(record, &rule.column).map(|cell| rule.values.iter().any(|v| *v == cell))
            })
            .unwrap_or(false)
    }

    fn extract_row(&self, record: &Record) -> Result<Block, RowError> {
        let locator_column = self.config.locator_column();
        let locator_value = non_empty_cell(record, locator_column)?;
        let line_value = non_empty_cell(record, &self.config.line_column)?;

        let line: i64 = line_value
            .parse()
            .map_err(|_| RowError::InvalidLine { value: line_value })?;
        if line <= 0 {
            return Err(RowError::NonPositiveLine { line });
        }

        let path = self.resolve_source(&locator_value)?;
        let source = std::fs::read_to_string(&path).map_err(|e| RowError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!("extracting block at line {} from {}", line, path.display());
        Ok(extract(&source, line)?)
    }

    fn resolve_source(&self, value: &str) -> Result<PathBuf, RowError> {
        let path = self.locator.resolve(value).ok_or_else(|| RowError::NoHashMatch {
            hash: value.to_string(),
            dir: self
                .config
                .contracts_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
            extension: self.config.extension.clone(),
        })?;

        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(RowError::NotAFile {
                path: path.display().to_string(),
            }),
            Err(_) => Err(RowError::SourceNotFound {
                path: path.display().to_string(),
            }),
        }
    }

    fn annotate(&self, record: &mut Record, row_number: usize, outcome: &RowOutcome) {
        let cfg = &self.config;
        let (text, start, end, status) = match outcome {
            RowOutcome::Extracted(block) => (
                Value::String(block.text.clone()),
                Value::from(block.start_line),
                Value::from(block.end_line),
                STATUS_SUCCESS.to_string(),
            ),
            RowOutcome::Skipped => {
                let value = cfg.skip.as_ref().map(|s| s.value.clone()).unwrap_or_default();
                (
                    Value::String(value),
                    Value::Null,
                    Value::Null,
                    STATUS_SKIPPED.to_string(),
                )
            }
            RowOutcome::Failed(err) => (
                Value::String(format!("row {}: {}", row_number, err)),
                Value::Null,
                Value::Null,
                err.kind().to_string(),
            ),
        };

        record.insert(cfg.output_column.clone(), text);
        record.insert(cfg.start_column.clone(), start);
        record.insert(cfg.end_column.clone(), end);
        record.insert(cfg.status_column.clone(), Value::String(status));
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} rows ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

fn non_empty_cell(record: &Record, column: &str) -> Result<String, RowError> {
    cell_str(record, column)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RowError::MissingColumn {
            column: column.to_string(),
        })
}
