//! Integration tests for block extraction against testdata fixtures.

use std::path::PathBuf;

use blockextract::{extract, ExtractError};

fn contracts_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("contracts")
}

fn read_contract(name: &str) -> String {
    std::fs::read_to_string(contracts_path().join(name)).expect("fixture should exist")
}

#[test]
fn test_every_line_of_withdraw_resolves_to_withdraw() {
    let source = read_contract("Bank.sol");
    let lines: Vec<&str> = source.lines().collect();

    for target in 21..=32 {
        let block = extract(&source, target).expect("withdraw should extract");
        assert_eq!(block.start_line, 21, "start for target {}", target);
        assert_eq!(block.end_line, 32, "end for target {}", target);

        let rejoined: Vec<&str> = block.text.split('\n').collect();
        assert_eq!(rejoined, lines[20..32].to_vec());
    }
}

#[test]
fn test_special_functions() {
    let source = read_contract("Bank.sol");

    let modifier = extract(&source, 9).unwrap();
    assert_eq!((modifier.start_line, modifier.end_line), (8, 11));

    let constructor = extract(&source, 14).unwrap();
    assert_eq!((constructor.start_line, constructor.end_line), (13, 15));

    let receive = extract(&source, 34).unwrap();
    assert_eq!(receive.text, "    receive() external payable {}");

    let fallback = extract(&source, 37).unwrap();
    assert_eq!((fallback.start_line, fallback.end_line), (36, 38));
}

#[test]
fn test_lines_between_blocks_are_rejected() {
    let source = read_contract("Bank.sol");

    // Blank line after deposit() and the contract's closing brace
    for target in [20, 39] {
        let err = extract(&source, target).unwrap_err();
        assert_eq!(err.kind(), "target_line_outside_block", "target {}", target);
    }
}

#[test]
fn test_header_lines_fall_forward_and_are_rejected() {
    let source = read_contract("Bank.sol");
    let err = extract(&source, 3).unwrap_err();
    assert_eq!(
        err,
        ExtractError::TargetLineOutsideBlock {
            target_line: 3,
            start_line: 8,
            end_line: 11,
        }
    );
}

#[test]
fn test_interface_declarations_have_no_body() {
    let source = read_contract("IToken.sol");
    for target in [5, 6] {
        let err = extract(&source, target).unwrap_err();
        assert_eq!(
            err,
            ExtractError::NoOpeningBrace {
                declaration_line: target as usize,
            }
        );
    }
}

#[test]
fn test_unbalanced_fixture() {
    let source = read_contract("Broken.sol");
    let err = extract(&source, 3).unwrap_err();
    assert_eq!(
        err,
        ExtractError::UnbalancedBraces {
            declaration_line: 2,
            brace_line: 2,
        }
    );
}

#[test]
fn test_out_of_range_targets() {
    let source = read_contract("Bank.sol");
    let line_count = source.lines().count();

    for target in [0, line_count as i64 + 1] {
        let err = extract(&source, target).unwrap_err();
        assert_eq!(
            err,
            ExtractError::InvalidTargetLine {
                target_line: target,
                line_count,
            }
        );
    }
}
