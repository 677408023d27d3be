//! blockextract - source-block extraction for mutation-testing pipelines.
//!
//! Given a source file and a line number, blockextract finds the function,
//! modifier, constructor, receive or fallback block enclosing that line and
//! returns its exact span. It does this with a keyword match and brace
//! counting instead of a parser, which keeps it fast enough to run over
//! thousands of mutated file variants.
//!
//! # Architecture
//!
//! - `extract`: the block extractor (pure, no I/O)
//! - `batch`: parallel extraction over dataset rows
//! - `dataset`: JSON / JSON Lines row I/O
//! - `filter`: row selection and column overrides
//! - `locate`: row-to-source-file resolution (by path or by hash)
//! - `findings`: analyzer findings overlapping a block, and count diffs
//! - `config`: YAML batch configuration
//! - `report`: output formatting (pretty, JSON)

pub mod batch;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod extract;
pub mod filter;
pub mod findings;
pub mod locate;
pub mod report;

pub use batch::{BatchResult, BatchRunner, BatchSummary, RowError};
pub use config::BatchConfig;
pub use dataset::Record;
pub use extract::{extract, Block, ExtractError};
pub use findings::{count_overlapping, diff_counts, CountDiff, Report};
