//! Row selection and column overrides for datasets.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::dataset::{cell_str, Record};

/// Column constraints. A row matches when every constrained column holds
/// one of its allowed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowFilter {
    columns: BTreeMap<String, Vec<String>>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `values` for `column`, extending any values already allowed.
    pub fn allow<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .entry(column.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Merge another filter's constraints into this one.
    pub fn merge(mut self, other: RowFilter) -> Self {
        for (column, values) in other.columns {
            self.columns.entry(column).or_default().extend(values);
        }
        self
    }

    /// Replace the allowed values of every column `other` constrains.
    /// Columns only this filter names are kept as they are.
    pub fn override_with(mut self, other: RowFilter) -> Self {
        self.columns.extend(other.columns);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check whether a record satisfies every constraint.
    pub fn matches(&self, record: &Record) -> bool {
        self.columns.iter().all(|(column, allowed)| {
            cell_str(record, column)
                .map(|cell| allowed.iter().any(|v| *v == cell))
                .unwrap_or(false)
        })
    }
}

impl std::fmt::Display for RowFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .columns
            .iter()
            .map(|(column, values)| format!("{}={}", column, values.join(",")))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Parse a `COLUMN=V1,V2` expression into its column and values.
pub fn parse_condition(expr: &str) -> anyhow::Result<(String, Vec<String>)> {
    let (column, values) = expr
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid filter {:?}, expected COLUMN=VALUE[,VALUE]", expr))?;

    let column = column.trim();
    if column.is_empty() {
        anyhow::bail!("invalid filter {:?}: empty column name", expr);
    }

    let values: Vec<String> = values
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        anyhow::bail!("invalid filter {:?}: no values", expr);
    }

    Ok((column.to_string(), values))
}

/// Parse a `COLUMN=V1,V2` expression into a filter.
pub fn parse_filter(expr: &str) -> anyhow::Result<RowFilter> {
    let (column, values) = parse_condition(expr)?;
    Ok(RowFilter::new().allow(&column, values))
}

/// Keep matching records, then truncate to `limit` when it is non-zero.
pub fn select(records: Vec<Record>, filter: &RowFilter, limit: Option<usize>) -> Vec<Record> {
    select_indexed(records, filter, limit)
        .into_iter()
        .map(|(_, record)| record)
        .collect()
}

/// Like [`select`], but pairs each kept record with its 0-based position
/// in the input.
pub fn select_indexed(
    records: Vec<Record>,
    filter: &RowFilter,
    limit: Option<usize>,
) -> Vec<(usize, Record)> {
    let total = records.len();
    let mut selected: Vec<(usize, Record)> = if filter.is_empty() {
        records.into_iter().enumerate().collect()
    } else {
        let kept: Vec<(usize, Record)> = records
            .into_iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .collect();
        tracing::info!("filtered rows: {}/{} ({})", kept.len(), total, filter);
        kept
    };

    if let Some(limit) = limit.filter(|&l| l > 0) {
        if limit < selected.len() {
            tracing::info!("limiting to the first {}/{} rows", limit, selected.len());
            selected.truncate(limit);
        }
    }

    selected
}

/// Set `target_column` to `value` on every record whose `trigger_column`
/// holds one of `trigger_values`. Returns the number of records changed.
pub fn override_column(
    records: &mut [Record],
    trigger_column: &str,
    trigger_values: &[String],
    target_column: &str,
    value: &str,
) -> usize {
    let mut changed = 0;
    for record in records.iter_mut() {
        let triggered = cell_str(record, trigger_column)
            .map(|cell| trigger_values.iter().any(|v| *v == cell))
            .unwrap_or(false);
        if triggered {
            record.insert(target_column.to_string(), Value::String(value.to_string()));
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Record> {
        let value = json!([
            {"Operator": "UTR", "Hash": "a1"},
            {"Operator": "LE", "Hash": "b2"},
            {"Operator": "UTR", "Hash": "c3"},
            {"Operator": "TD", "Hash": "d4"},
            {"Hash": "e5"}
        ]);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_filter() {
        let filter = parse_filter("Operator= UTR, LE").unwrap();
        assert_eq!(filter, RowFilter::new().allow("Operator", ["UTR", "LE"]));
        assert_eq!(filter.to_string(), "Operator=UTR,LE");
    }

    #[test]
    fn test_parse_filter_rejects_malformed() {
        assert!(parse_filter("Operator").is_err());
        assert!(parse_filter("=UTR").is_err());
        assert!(parse_filter("Operator=").is_err());
    }

    #[test]
    fn test_parse_condition() {
        let (column, values) = parse_condition("Operator=LE, UTR").unwrap();
        assert_eq!(column, "Operator");
        assert_eq!(values, vec!["LE".to_string(), "UTR".to_string()]);
    }

    #[test]
    fn test_select_filters_then_limits() {
        let filter = parse_filter("Operator=UTR").unwrap();
        let selected = select(rows(), &filter, Some(1));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0]["Hash"], json!("a1"));
    }

    #[test]
    fn test_select_indexed_keeps_input_positions() {
        let filter = parse_filter("Operator=UTR").unwrap();
        let positions: Vec<usize> = select_indexed(rows(), &filter, None)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[test]
    fn test_select_missing_column_does_not_match() {
        let filter = parse_filter("Operator=UTR,LE,TD").unwrap();
        assert_eq!(select(rows(), &filter, None).len(), 4);
    }

    #[test]
    fn test_select_zero_limit_keeps_all() {
        assert_eq!(select(rows(), &RowFilter::new(), Some(0)).len(), 5);
    }

    #[test]
    fn test_filters_are_anded_across_columns() {
        let filter = parse_filter("Operator=UTR")
            .unwrap()
            .merge(parse_filter("Hash=c3").unwrap());
        let selected = select(rows(), &filter, None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0]["Hash"], json!("c3"));
    }

    #[test]
    fn test_override_with_replaces_named_columns() {
        let base = RowFilter::new()
            .allow("Operator", ["UTR", "RSD"])
            .allow("Status", ["killed"]);
        let filter = base.override_with(parse_filter("Operator=LE").unwrap());
        assert_eq!(
            filter,
            RowFilter::new()
                .allow("Operator", ["LE"])
                .allow("Status", ["killed"])
        );
    }

    #[test]
    fn test_override_column() {
        let mut records = rows();
        let changed = override_column(
            &mut records,
            "Operator",
            &["LE".to_string()],
            "ExtractedFunction",
            "N/A",
        );
        assert_eq!(changed, 1);
        assert_eq!(records[1]["ExtractedFunction"], json!("N/A"));
        assert!(records[0].get("ExtractedFunction").is_none());
    }
}
