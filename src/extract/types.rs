//! Core types for extraction results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A block of source lines, from its declaration line through the line
/// holding its closing brace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based line of the declaration keyword
    pub start_line: usize,
    /// 1-based line of the matching closing brace (inclusive)
    pub end_line: usize,
    /// Verbatim source lines joined with `\n`
    pub text: String,
}

impl Block {
    /// Number of lines spanned by the block.
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Check if a 1-based line falls inside the block.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// Reasons an extraction can fail.
///
/// Every variant is row-scoped: callers record the message and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("target line {target_line} is not valid for a file with {line_count} lines")]
    InvalidTargetLine { target_line: i64, line_count: usize },

    #[error(
        "no declaration (function/modifier/constructor/receive/fallback) found near line {target_line}"
    )]
    NoDeclarationFound { target_line: i64 },

    #[error(
        "cannot find '{{' after the declaration at line {declaration_line} (interface, abstract or incomplete declaration?)"
    )]
    NoOpeningBrace { declaration_line: usize },

    #[error(
        "cannot find the '}}' matching the block declared at line {declaration_line} (opening brace at line {brace_line}); check the source for unbalanced braces"
    )]
    UnbalancedBraces {
        declaration_line: usize,
        brace_line: usize,
    },

    #[error("target line {target_line} is not inside the identified block {start_line}-{end_line}")]
    TargetLineOutsideBlock {
        target_line: i64,
        start_line: usize,
        end_line: usize,
    },
}

impl ExtractError {
    /// Stable name for this failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::InvalidTargetLine { .. } => "invalid_target_line",
            ExtractError::NoDeclarationFound { .. } => "no_declaration_found",
            ExtractError::NoOpeningBrace { .. } => "no_opening_brace",
            ExtractError::UnbalancedBraces { .. } => "unbalanced_braces",
            ExtractError::TargetLineOutsideBlock { .. } => "target_line_outside_block",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_contains_line() {
        let block = Block {
            start_line: 2,
            end_line: 6,
            text: String::new(),
        };
        assert!(block.contains_line(2));
        assert!(block.contains_line(6));
        assert!(!block.contains_line(1));
        assert!(!block.contains_line(7));
        assert_eq!(block.line_count(), 5);
    }

    #[test]
    fn test_error_messages_escape_braces() {
        let err = ExtractError::NoOpeningBrace {
            declaration_line: 4,
        };
        assert!(err.to_string().contains("'{'"));
        assert!(err.to_string().contains("line 4"));

        let err = ExtractError::UnbalancedBraces {
            declaration_line: 4,
            brace_line: 5,
        };
        assert!(err.to_string().contains("'}'"));
        assert_eq!(err.kind(), "unbalanced_braces");
    }
}
