//! Line scanner for the assembly source format.
//!
//! The source format is line-oriented: an optional label in column 0, a
//! mnemonic, and an optional operand field. Lines whose first non-blank
//! character is `.` are comments. There is no expression grammar; operand
//! fields are passed through as text and interpreted by the assembler.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number, for diagnostics.
    pub number: usize,
    /// Present iff column 0 held a non-whitespace character.
    pub label: Option<String>,
    pub mnemonic: String,
    pub operand: Option<String>,
}

/// Scans a whole source text, dropping blanks and comments.
pub fn scan_source(src: &str) -> Vec<SourceLine> {
    src.lines()
        .enumerate()
        .filter_map(|(index, line)| scan_line(index + 1, line))
        .collect()
}

fn scan_line(number: usize, line: &str) -> Option<SourceLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        return None;
    }

    let has_label = !line.starts_with(char::is_whitespace);
    let mut rest = line;

    let label = if has_label {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (name, tail) = rest.split_at(end);
        rest = tail;
        Some(name.to_string())
    } else {
        None
    };

    rest = rest.trim_start();
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (mnemonic, tail) = rest.split_at(end);
    if mnemonic.is_empty() {
        // a label with no statement carries no meaning here
        return None;
    }

    let operand = tail.trim();
    Some(SourceLine {
        number,
        label,
        mnemonic: mnemonic.to_string(),
        operand: (!operand.is_empty()).then(|| operand.to_string()),
    })
}

/// Parses a numeric operand: optional leading `-`, `0x` prefix for hex,
/// decimal otherwise, with a bare-hex fallback for digit strings like `FF`.
pub fn parse_number(text: &str) -> Option<i32> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Ok(dec) = digits.parse::<i64>() {
        dec
    } else {
        i64::from_str_radix(digits, 16).ok()?
    };
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("malformed byte literal {0:?}")]
    Malformed(String),
}

/// Parses a `BYTE` literal: `C'...'` yields the characters' bytes,
/// `X'...'` an even-length hex digit string.
pub fn parse_byte_literal(text: &str) -> Result<Vec<u8>, LiteralError> {
    let malformed = || LiteralError::Malformed(text.to_string());

    let (kind, rest) = text.split_at(text.chars().next().map_or(0, char::len_utf8));
    let body = rest
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .ok_or_else(malformed)?;

    match kind {
        "C" => Ok(body.bytes().collect()),
        "X" => {
            if body.is_empty() || body.len() % 2 != 0 {
                return Err(malformed());
            }
            (0..body.len())
                .step_by(2)
                .map(|at| u8::from_str_radix(&body[at..at + 2], 16).map_err(|_| malformed()))
                .collect()
        }
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_splits_label_mnemonic_operand() {
        let lines = scan_source("LOOP  LDA   COUNT\n      RSUB\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].label.as_deref(), Some("LOOP"));
        assert_eq!(lines[0].mnemonic, "LDA");
        assert_eq!(lines[0].operand.as_deref(), Some("COUNT"));
        assert_eq!(lines[1].label, None);
        assert_eq!(lines[1].mnemonic, "RSUB");
        assert_eq!(lines[1].operand, None);
    }

    #[test]
    fn scan_skips_blanks_and_comments() {
        let lines = scan_source("\n. a comment\n   . indented comment\n      RSUB\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 4);
    }

    #[test]
    fn label_requires_column_zero() {
        let lines = scan_source("  NOTLABEL 5\n");
        assert_eq!(lines[0].label, None);
        assert_eq!(lines[0].mnemonic, "NOTLABEL");
    }

    #[test]
    fn operand_keeps_inner_spaces() {
        let lines = scan_source("MSG   BYTE  C'HI THERE'\n");
        assert_eq!(lines[0].operand.as_deref(), Some("C'HI THERE'"));
    }

    #[test]
    fn numbers_parse_in_all_accepted_forms() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("-7"), Some(-7));
        assert_eq!(parse_number("0x1A"), Some(0x1A));
        assert_eq!(parse_number("FF"), Some(0xFF));
        assert_eq!(parse_number("banana"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn char_literal_yields_bytes() {
        assert_eq!(parse_byte_literal("C'EOF'"), Ok(vec![b'E', b'O', b'F']));
    }

    #[test]
    fn hex_literal_yields_bytes() {
        assert_eq!(parse_byte_literal("X'F1A2'"), Ok(vec![0xF1, 0xA2]));
    }

    #[test]
    fn malformed_literals_are_rejected() {
        for bad in ["C'unterminated", "X'F'", "X''", "X'GG'", "Q'AB'", ""] {
            assert!(parse_byte_literal(bad).is_err(), "{:?}", bad);
        }
    }
}
