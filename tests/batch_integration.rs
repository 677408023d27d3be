//! Integration tests for the batch pipeline: dataset in, annotated dataset
//! out, then finding overlap and diffs on the extracted ranges.

use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

use blockextract::config::LocateMode;
use blockextract::dataset;
use blockextract::findings::{count_overlapping, diff_counts, Report};
use blockextract::{BatchConfig, BatchRunner};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn status(record: &dataset::Record, config: &BatchConfig) -> String {
    record[&config.status_column].as_str().unwrap().to_string()
}

#[test]
fn test_path_mode_over_fixture_rows() {
    let testdata = testdata_path();
    let records = dataset::read_records(testdata.join("rows.json")).unwrap();

    let config = BatchConfig {
        base_dir: Some(testdata.join("contracts")),
        output_column: "ExtractedFunctionOriginal".to_string(),
        ..Default::default()
    };
    let runner = BatchRunner::new(config.clone()).unwrap();
    let result = runner.run(records);

    assert_eq!(result.summary.total, 6);
    assert_eq!(result.summary.succeeded, 3);
    assert_eq!(result.summary.failed, 3);
    assert_eq!(result.summary.failures["no_opening_brace"], 1);
    assert_eq!(result.summary.failures["unbalanced_braces"], 1);
    assert_eq!(result.summary.failures["target_line_outside_block"], 1);

    let statuses: Vec<String> = result.records.iter().map(|r| status(r, &config)).collect();
    assert_eq!(
        statuses,
        vec![
            "success",
            "success",
            "success",
            "no_opening_brace",
            "unbalanced_braces",
            "target_line_outside_block",
        ]
    );

    let withdraw = &result.records[0];
    assert_eq!(withdraw["BlockStartLine"], json!(21));
    assert_eq!(withdraw["BlockEndLine"], json!(32));
    assert!(withdraw["ExtractedFunctionOriginal"]
        .as_str()
        .unwrap()
        .contains("balances[msg.sender] -= amount;"));

    let failure = result.records[3]["ExtractedFunctionOriginal"].as_str().unwrap();
    assert!(failure.starts_with("row 4: "), "got {:?}", failure);
    assert_eq!(result.records[3]["BlockStartLine"], Value::Null);
}

#[test]
fn test_hash_mode_writes_jsonl_output() {
    let testdata = testdata_path();
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out/mutations.jsonl");

    let config = BatchConfig::parse(&format!(
        r#"
mode: hash
contracts_dir: '{}'
output_column: ExtractedFunctionMutation
filters:
  Operator: [RSD, LE, UTR]
skip:
  column: Operator
  values: [LE]
"#,
        testdata.join("mutants").display()
    ))
    .unwrap();
    assert_eq!(config.mode, LocateMode::Hash);
    blockextract::config::validate(&config).unwrap();

    let records = dataset::read_records(testdata.join("rows.json")).unwrap();
    let result = BatchRunner::new(config).unwrap().run(records);
    dataset::write_records(&output, &result.records).unwrap();

    let written = dataset::read_records(&output).unwrap();
    assert_eq!(written.len(), 6);
    assert_eq!(result.summary.skipped, 1);
    assert_eq!(result.summary.failures["no_hash_match"], 1);

    let mutated = written[0]["ExtractedFunctionMutation"].as_str().unwrap();
    assert!(mutated.contains("balances[msg.sender] = 0;"));
    assert_eq!(written[2]["ExtractedFunctionMutation"], json!("N/A"));
}

#[test]
fn test_findings_overlap_on_extracted_blocks() {
    let testdata = testdata_path();
    let report = Report::parse_file(testdata.join("slither.json")).unwrap();

    let source = std::fs::read_to_string(testdata.join("contracts/Bank.sol")).unwrap();
    let withdraw = blockextract::extract(&source, 28).unwrap();
    let modifier = blockextract::extract(&source, 10).unwrap();

    let in_withdraw = count_overlapping(
        &report,
        withdraw.start_line,
        withdraw.end_line,
        Some("Bank.sol"),
    );
    assert_eq!(in_withdraw.get("reentrancy-eth"), Some(&1));
    assert_eq!(in_withdraw.get("low-level-calls"), Some(&1));
    assert!(in_withdraw.get("solc-version").is_none());

    let in_modifier =
        count_overlapping(&report, modifier.start_line, modifier.end_line, None);
    assert!(in_modifier.is_empty());

    let diff = diff_counts(&in_withdraw, &in_modifier);
    assert_eq!(diff.removed.len(), 2);
    assert!(diff.added.is_empty());
}

#[test]
fn test_select_and_convert_round_trip_through_files() {
    let testdata = testdata_path();
    let temp = TempDir::new().unwrap();
    let jsonl = temp.path().join("rows.jsonl");
    let back = temp.path().join("rows.json");

    assert_eq!(dataset::convert(testdata.join("rows.json"), &jsonl).unwrap(), 6);

    let records = dataset::read_records(&jsonl).unwrap();
    let filter = blockextract::filter::parse_filter("Operator=UTR").unwrap();
    let selected = blockextract::filter::select(records, &filter, Some(2));
    dataset::write_records(&back, &selected).unwrap();

    let reread = dataset::read_records(&back).unwrap();
    assert_eq!(reread.len(), 2);
    assert_eq!(reread[0]["StartLine"], json!(9));
    assert_eq!(reread[1]["File"], json!("IToken.sol"));
}
