//! Static-analysis findings and their overlap with extracted blocks.
//!
//! Reports use the detector layout emitted by Slither's `--json` output:
//! each detector result names a check and lists source elements, each with
//! the lines it covers. Only the fields needed for overlap counting are read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Top-level analyzer report.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Report {
    #[serde(default)]
    pub results: ReportResults,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportResults {
    #[serde(default)]
    pub detectors: Vec<Finding>,
}

/// A single detector result.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Finding {
    #[serde(default)]
    pub check: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Element {
    #[serde(default)]
    pub source_mapping: SourceMapping,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceMapping {
    #[serde(default)]
    pub filename_relative: String,
    #[serde(default)]
    pub lines: Vec<usize>,
}

impl Report {
    /// Parse a report from JSON text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let report: Report = serde_json::from_str(content)?;
        Ok(report)
    }

    /// Parse a report from a JSON file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading report {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| anyhow::anyhow!("parsing report {}: {}", path.display(), e))
    }

    pub fn findings(&self) -> &[Finding] {
        &self.results.detectors
    }
}

impl Finding {
    /// Check if any element reports a line in `[start, end]`.
    ///
    /// With `file_suffix`, only elements whose file name ends with it count.
    pub fn overlaps(&self, start: usize, end: usize, file_suffix: Option<&str>) -> bool {
        self.elements.iter().any(|el| {
            let mapping = &el.source_mapping;
            let file_ok = file_suffix
                .map(|s| mapping.filename_relative.ends_with(s))
                .unwrap_or(true);
            file_ok && mapping.lines.iter().any(|&l| start <= l && l <= end)
        })
    }
}

/// Count findings per check that overlap the line range `[start, end]`.
pub fn count_overlapping(
    report: &Report,
    start: usize,
    end: usize,
    file_suffix: Option<&str>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for finding in report.findings() {
        if finding.overlaps(start, end, file_suffix) {
            *counts.entry(finding.check.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// A check whose count differs between two mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountChange {
    pub check: String,
    pub before: usize,
    pub after: usize,
}

/// Difference between two finding-count mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountDiff {
    /// Checks only present after
    pub added: Vec<CountChange>,
    /// Checks only present before
    pub removed: Vec<CountChange>,
    /// Checks present in both with a different count
    pub changed: Vec<CountChange>,
}

impl CountDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compare two finding-count mappings. Checks with equal counts are omitted.
pub fn diff_counts(before: &BTreeMap<String, usize>, after: &BTreeMap<String, usize>) -> CountDiff {
    let mut diff = CountDiff::default();

    for (check, &b) in before {
        match after.get(check) {
            None => diff.removed.push(CountChange {
                check: check.clone(),
                before: b,
                after: 0,
            }),
            Some(&a) if a != b => diff.changed.push(CountChange {
                check: check.clone(),
                before: b,
                after: a,
            }),
            Some(_) => {}
        }
    }

    for (check, &a) in after {
        if !before.contains_key(check) {
            diff.added.push(CountChange {
                check: check.clone(),
                before: 0,
                after: a,
            });
        }
    }

    diff
}

/// Read a finding-count mapping stored as a JSON object.
pub fn read_counts<P: AsRef<Path>>(path: P) -> anyhow::Result<BTreeMap<String, usize>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading counts {}: {}", path.display(), e))?;
    let counts: BTreeMap<String, usize> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("parsing counts {}: {}", path.display(), e))?;
    Ok(counts)
}
