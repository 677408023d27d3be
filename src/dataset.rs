//! Reading and writing tabular datasets.
//!
//! A dataset is a list of records (ordered JSON objects). Three on-disk
//! layouts are supported, chosen by file extension:
//! - `.csv`: a header row, then one row per record
//! - `.jsonl` / `.ndjson`: one object per line
//! - anything else: a single JSON array of objects

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// One row of a dataset. Column order is preserved.
pub type Record = Map<String, Value>;

/// On-disk layout of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
    JsonLines,
}

impl Format {
    /// Determine the layout from a path's extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Format::Csv,
            Some("jsonl") | Some("ndjson") => Format::JsonLines,
            _ => Format::Json,
        }
    }
}

/// Read all records from a dataset file.
pub fn read_records<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Record>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading dataset {}: {}", path.display(), e))?;
    parse_records(&content, Format::from_path(path))
        .map_err(|e| anyhow::anyhow!("parsing dataset {}: {}", path.display(), e))
}

/// Parse records from in-memory content.
pub fn parse_records(content: &str, format: Format) -> anyhow::Result<Vec<Record>> {
    match format {
        Format::Csv => parse_csv(content),
        Format::Json => {
            if content.trim().is_empty() {
                return Ok(Vec::new());
            }
            let records: Vec<Record> = serde_json::from_str(content)?;
            Ok(records)
        }
        Format::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Record>(line)
                    .map_err(|e| anyhow::anyhow!("line {}: {}", i + 1, e))
            })
            .collect(),
    }
}

/// Write records to a dataset file, creating parent directories as needed.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[Record]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = render_records(records, Format::from_path(path))?;
    fs::write(path, content)
        .map_err(|e| anyhow::anyhow!("writing dataset {}: {}", path.display(), e))?;
    tracing::debug!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Render records in the given layout.
pub fn render_records(records: &[Record], format: Format) -> anyhow::Result<String> {
    match format {
        Format::Csv => render_csv(records),
        Format::Json => to_pretty_json(records),
        Format::JsonLines => {
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Parse CSV with a header row. Every cell is read as a string; cells
/// missing from short rows are `null`.
fn parse_csv(content: &str) -> anyhow::Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        // Line 1 is the header.
        let row = row.map_err(|e| anyhow::anyhow!("line {}: {}", i + 2, e))?;
        let mut record = Record::new();
        for (j, column) in headers.iter().enumerate() {
            let value = row
                .get(j)
                .map(|cell| Value::String(cell.to_string()))
                .unwrap_or(Value::Null);
            record.insert(column.to_string(), value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Render CSV. Columns appear in first-seen order across all records, so
/// input columns come first and added columns follow.
fn render_csv(records: &[Record]) -> anyhow::Result<String> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| csv_cell(record.get(*column)))
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing csv: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Serialize with 4-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

/// Convert a dataset between layouts. Returns the number of records written.
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> anyhow::Result<usize> {
    let records = read_records(input)?;
    write_records(output, &records)?;
    Ok(records.len())
}

/// Read a cell as a trimmed string. Strings and numbers are accepted.
pub fn cell_str(record: &Record, column: &str) -> Option<String> {
    match record.get(column)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
