// src/grammar/rules.rs

//! Operator classification, precedence and token shapes.

use crate::errors::{CalcError, Result};
use crate::types::Operator;

/// Binding strength of an operator group. Both groups are left-associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Additive,
    Multiplicative,
}

impl Precedence {
    /// Levels in the order the decomposer reduces them.
    pub const REDUCTION_ORDER: [Precedence; 2] = [Precedence::Multiplicative, Precedence::Additive];

    pub fn of(op: Operator) -> Self {
        match op {
            Operator::Mul | Operator::Div => Precedence::Multiplicative,
            Operator::Add | Operator::Sub => Precedence::Additive,
        }
    }

    /// Operator characters belonging to this level.
    pub fn symbols(self) -> &'static [char] {
        match self {
            Precedence::Multiplicative => &['*', '/'],
            Precedence::Additive => &['+', '-'],
        }
    }
}

pub fn is_operator_char(c: char) -> bool {
    Operator::from_char(c).is_some()
}

/// Characters the decomposer accepts after whitespace stripping.
pub fn is_expression_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '(' || c == ')' || is_operator_char(c)
}

/// A `-` is unary at the start of the text, or right after another
/// operator or an opening parenthesis.
pub fn is_unary_minus(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c == '(' || is_operator_char(c),
    }
}

/// Parse a numeric literal: ASCII digits with at most one `.`.
///
/// `f64::from_str` alone would also accept `inf`, `NaN` and exponents,
/// none of which belong to the grammar.
pub fn parse_literal(token: &str) -> Option<f64> {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in token.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }
    token.parse::<f64>().ok()
}

/// Apply a binary operator. Division by zero is only detectable here, once
/// both operand values are known.
pub fn apply_operator(op: Operator, lhs: f64, rhs: f64) -> Result<f64> {
    match op {
        Operator::Add => Ok(lhs + rhs),
        Operator::Sub => Ok(lhs - rhs),
        Operator::Mul => Ok(lhs * rhs),
        Operator::Div => {
            if rhs == 0.0 {
                Err(CalcError::ExecutionError(format!("division by zero: {lhs} / {rhs}")))
            } else {
                Ok(lhs / rhs)
            }
        }
    }
}

/// Placeholder token spliced in for an already-planned unit.
pub fn placeholder(index: usize) -> String {
    format!("T{index}")
}

/// Parse a `T<n>` placeholder back into its index.
pub fn parse_placeholder(token: &str) -> Option<usize> {
    let digits = token.strip_prefix('T')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
