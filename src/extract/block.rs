//! Declaration search and brace matching.

use lazy_static::lazy_static;
use regex::Regex;

use super::{Block, ExtractError};

lazy_static! {
    /// Start of a block declaration. The opening brace may sit on a later line.
    static ref DECLARATION_PATTERN: Regex =
        Regex::new(r"^\s*(?:function|modifier|constructor|receive|fallback)\b").unwrap();
}

/// Extract the block enclosing `target_line` (1-based) from `source`.
///
/// The declaration is the last keyword line at or before the target line,
/// falling back to the first one after it. The body runs from the first
/// `{` after the declaration to the brace that brings the depth back to
/// zero.
///
/// Comment handling is deliberately naive: only `//` through end of line
/// is stripped before brace counting, even when the `//` sits inside a
/// string literal. Block comments and braces inside string literals are
/// counted as code, and the declaration match does not strip comments at all.
///
/// Lines break on `\n`, `\r\n`, a lone `\r` and the other Unicode line
/// separators.
pub fn extract(source: &str, target_line: i64) -> Result<Block, ExtractError> {
    let lines = split_lines(source);

    if target_line <= 0 || target_line as u64 > lines.len() as u64 {
        return Err(ExtractError::InvalidTargetLine {
            target_line,
            line_count: lines.len(),
        });
    }
    let target = target_line as usize;

    let declaration = find_declaration(&lines, target)
        .ok_or(ExtractError::NoDeclarationFound { target_line })?;

    let (brace_idx, brace_col) = find_opening_brace(&lines, declaration - 1).ok_or(
        ExtractError::NoOpeningBrace {
            declaration_line: declaration,
        },
    )?;

    let end_idx = find_closing_brace(&lines, brace_idx, brace_col).ok_or(
        ExtractError::UnbalancedBraces {
            declaration_line: declaration,
            brace_line: brace_idx + 1,
        },
    )?;
    let end_line = end_idx + 1;

    if !(declaration <= target && target <= end_line) {
        return Err(ExtractError::TargetLineOutsideBlock {
            target_line,
            start_line: declaration,
            end_line,
        });
    }

    Ok(Block {
        start_line: declaration,
        end_line,
        text: lines[declaration - 1..=end_idx].join("\n"),
    })
}

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'
            | '\u{1d}'
            | '\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Split into lines without terminators. `\r\n` counts as one break and a
/// trailing terminator does not start an extra empty line.
fn split_lines(source: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = source.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if !is_line_break(ch) {
            continue;
        }
        lines.push(&source[start..i]);
        start = i + ch.len_utf8();
        if ch == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }

    if start < source.len() {
        lines.push(&source[start..]);
    }
    lines
}

/// Pick the 1-based declaration line owning `target`.
fn find_declaration(lines: &[&str], target: usize) -> Option<usize> {
    let candidates: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| DECLARATION_PATTERN.is_match(line))
        .map(|(i, _)| i + 1)
        .collect();

    candidates
        .iter()
        .rev()
        .find(|&&line| line <= target)
        .or_else(|| candidates.iter().find(|&&line| line > target))
        .copied()
}

/// Drop everything from the first `//` onward.
fn strip_line_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Find the first `{` at or after line index `from`, as (line index, byte column).
fn find_opening_brace(lines: &[&str], from: usize) -> Option<(usize, usize)> {
    lines
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(i, line)| strip_line_comment(line).find('{').map(|col| (i, col)))
}

/// Scan from the opening brace until depth returns to zero.
///
/// Returns the line index holding the matching `}`.
fn find_closing_brace(lines: &[&str], brace_idx: usize, brace_col: usize) -> Option<usize> {
    let mut depth: usize = 1;

    for (i, line) in lines.iter().enumerate().skip(brace_idx) {
        let content = strip_line_comment(line);
        let rest = if i == brace_idx {
            &content[brace_col + 1..]
        } else {
            content
        };

        for ch in rest.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
    }

    None
}
