// src/grammar/validate.rs

//! Submission-time input check.
//!
//! This runs before an expression is accepted at all; the decomposer still
//! performs its own structural checks afterwards.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{CalcError, Result};
use crate::grammar::rules::is_operator_char;

static ALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-*/().\s]+$").expect("static regex is valid"));

pub fn validate_input(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(CalcError::InvalidInput("expression is empty".to_string()));
    }

    if !ALLOWED.is_match(raw) {
        return Err(CalcError::InvalidInput(
            "only digits, '.', '+', '-', '*', '/' and parentheses are allowed".to_string(),
        ));
    }

    let mut depth: i64 = 0;
    for c in raw.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(CalcError::InvalidInput(
                        "closing parenthesis without a matching '('".to_string(),
                    ));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(CalcError::InvalidInput("unbalanced parentheses".to_string()));
    }

    if let Some(last) = raw.chars().rev().find(|c| !c.is_whitespace()) {
        if is_operator_char(last) {
            return Err(CalcError::InvalidInput(format!(
                "expression ends with operator '{last}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_input() {
        for ok in ["2+2*2", " (1 + 2) * 3 ", "-2+3", "1.5/0.5"] {
            assert!(validate_input(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn rejects_bad_input() {
        for bad in ["", "   ", "2+a", "(1+2", "1+2)", ")(", "123+", "4*"] {
            assert!(
                matches!(validate_input(bad), Err(CalcError::InvalidInput(_))),
                "{bad:?}"
            );
        }
    }
}
