//! Batch configuration schema.
//!
//! All paths and column names used by a batch run come from here (or from
//! CLI flags layered on top). Nothing is read from process-wide constants.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::filter::RowFilter;

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["blockextract.yaml", ".blockextract.yaml"];

/// How a row's source file is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocateMode {
    /// The row carries a file path
    #[default]
    Path,
    /// The row carries a hash contained in the file name
    Hash,
}

impl std::fmt::Display for LocateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocateMode::Path => write!(f, "path"),
            LocateMode::Hash => write!(f, "hash"),
        }
    }
}

impl std::str::FromStr for LocateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path" => Ok(LocateMode::Path),
            "hash" => Ok(LocateMode::Hash),
            _ => Err(format!("unknown mode: {}", s)),
        }
    }
}

/// Rows that bypass extraction and receive a fixed value instead.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SkipRule {
    pub column: String,
    pub values: Vec<String>,
    #[serde(default = "default_skip_value")]
    pub value: String,
}

fn default_skip_value() -> String {
    "N/A".to_string()
}

/// Top-level batch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub mode: LocateMode,
    pub path_column: String,
    pub hash_column: String,
    pub line_column: String,
    pub output_column: String,
    pub start_column: String,
    pub end_column: String,
    pub status_column: String,
    /// Directory indexed in hash mode
    pub contracts_dir: Option<PathBuf>,
    /// Base for relative paths in path mode
    pub base_dir: Option<PathBuf>,
    /// Source file extension indexed in hash mode
    pub extension: String,
    /// Glob patterns for paths to exclude from the hash index
    pub exclude: Vec<String>,
    pub filters: RowFilter,
    pub limit: Option<usize>,
    pub skip: Option<SkipRule>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: LocateMode::Path,
            path_column: "File".to_string(),
            hash_column: "Hash".to_string(),
            line_column: "StartLine".to_string(),
            output_column: "ExtractedFunction".to_string(),
            start_column: "BlockStartLine".to_string(),
            end_column: "BlockEndLine".to_string(),
            status_column: "ExtractionStatus".to_string(),
            contracts_dir: None,
            base_dir: None,
            extension: "sol".to_string(),
            exclude: Vec::new(),
            filters: RowFilter::default(),
            limit: None,
            skip: None,
        }
    }
}

impl BatchConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a config from YAML text. Empty text yields the defaults.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: BatchConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Column holding the source locator for the configured mode.
    pub fn locator_column(&self) -> &str {
        match self.mode {
            LocateMode::Path => &self.path_column,
            LocateMode::Hash => &self.hash_column,
        }
    }
}

/// Look for a config file in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Validate a config.
pub fn validate(config: &BatchConfig) -> anyhow::Result<()> {
    if config.mode == LocateMode::Hash && config.contracts_dir.is_none() {
        anyhow::bail!("hash mode requires contracts_dir");
    }

    if config.extension.trim().is_empty() {
        anyhow::bail!("extension must not be empty");
    }

    for pattern in &config.exclude {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
    }

    let columns = [
        &config.output_column,
        &config.start_column,
        &config.end_column,
        &config.status_column,
    ];
    for (i, a) in columns.iter().enumerate() {
        if a.is_empty() {
            anyhow::bail!("output column names must not be empty");
        }
        if columns[i + 1..].contains(a) {
            anyhow::bail!("output column {:?} is used more than once", a);
        }
    }

    Ok(())
}
