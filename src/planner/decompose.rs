// src/planner/decompose.rs

//! Infix text -> staged unit DAG.
//!
//! Reduction works directly on the normalized text. Each planned unit is
//! spliced back as a `T<n>` placeholder:
//!
//! 1. parentheses, deepest pair first (rightmost on ties), each interior
//!    planned as a flat sub-expression;
//! 2. `*` and `/`, leftmost first;
//! 3. `+` and `-`, leftmost first;
//! 4. the remaining single token is the terminal (a bare literal gets an
//!    identity unit `lit + 0`).

use tracing::trace;

use crate::errors::{CalcError, Result};
use crate::grammar::normalize;
use crate::grammar::rules::{
    Precedence, is_operator_char, parse_literal, parse_placeholder, placeholder,
};
use crate::planner::plan::{Plan, PlannedUnit, StagedOperand};
use crate::types::Operator;

/// Decompose `raw` into a staged plan.
pub fn plan(raw: &str) -> Result<Plan> {
    let text = normalize(raw)?;
    let mut units = Vec::new();
    let terminal = reduce_parentheses(&mut units, text)?;
    Plan::from_units(units, terminal)
}

fn reduce_parentheses(units: &mut Vec<PlannedUnit>, mut text: String) -> Result<usize> {
    while let Some(open) = deepest_open_paren(&text) {
        let close = text[open..]
            .find(')')
            .map(|offset| open + offset)
            .ok_or_else(|| CalcError::malformed("unmatched '('"))?;

        let sub = reduce_flat(units, &text[open + 1..close])?;
        text.replace_range(open..=close, &placeholder(sub));
        trace!(%text, "reduced parenthesised group");
    }

    if text.contains(')') {
        return Err(CalcError::malformed("unmatched ')'"));
    }

    reduce_flat(units, &text)
}

/// Position of the `(` at maximum nesting depth; the rightmost one on ties.
fn deepest_open_paren(text: &str) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut best: Option<(usize, i64)> = None;

    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                depth += 1;
                if best.is_none_or(|(_, d)| depth >= d) {
                    best = Some((i, depth));
                }
            }
            ')' => depth -= 1,
            _ => {}
        }
    }

    best.map(|(i, _)| i)
}

/// Plan a parenthesis-free segment and return its terminal index.
fn reduce_flat(units: &mut Vec<PlannedUnit>, segment: &str) -> Result<usize> {
    let mut text = segment.to_string();

    for level in Precedence::REDUCTION_ORDER {
        while let Some(op_pos) = text.find(level.symbols()) {
            let op = text[op_pos..]
                .chars()
                .next()
                .and_then(Operator::from_char)
                .ok_or_else(|| CalcError::malformed("operator vanished during reduction"))?;

            let (lhs, start) = left_operand(units, &text, op_pos)?;
            let (rhs, end) = right_operand(units, &text, op_pos)?;

            units.push(PlannedUnit::binary(op, lhs, rhs));
            let index = units.len() - 1;
            text.replace_range(start..end, &placeholder(index));
            trace!(%text, unit = index, %op, "staged unit");
        }
    }

    finish_segment(units, &text)
}

/// Operand ending just before `op_pos`, and where it starts.
fn left_operand(
    units: &[PlannedUnit],
    text: &str,
    op_pos: usize,
) -> Result<(StagedOperand, usize)> {
    let start = text[..op_pos]
        .rfind(is_operator_char)
        .map(|i| i + 1)
        .unwrap_or(0);
    let operand = resolve_token(units, &text[start..op_pos])?;
    Ok((operand, start))
}

/// Operand starting just after `op_pos`, and where it ends.
fn right_operand(
    units: &[PlannedUnit],
    text: &str,
    op_pos: usize,
) -> Result<(StagedOperand, usize)> {
    let from = op_pos + 1;
    let end = text[from..]
        .find(is_operator_char)
        .map(|i| from + i)
        .unwrap_or(text.len());
    let operand = resolve_token(units, &text[from..end])?;
    Ok((operand, end))
}

fn resolve_token(units: &[PlannedUnit], token: &str) -> Result<StagedOperand> {
    if token.is_empty() {
        return Err(CalcError::malformed("missing operand next to an operator"));
    }
    if let Some(index) = parse_placeholder(token) {
        if index >= units.len() {
            return Err(CalcError::malformed(format!(
                "placeholder {token} does not name a planned unit"
            )));
        }
        return Ok(StagedOperand::Staged(index));
    }
    parse_literal(token)
        .map(StagedOperand::Literal)
        .ok_or_else(|| CalcError::malformed(format!("invalid operand '{token}'")))
}

fn finish_segment(units: &mut Vec<PlannedUnit>, text: &str) -> Result<usize> {
    match resolve_token(units, text) {
        Ok(StagedOperand::Staged(index)) => Ok(index),
        Ok(literal @ StagedOperand::Literal(_)) => {
            units.push(PlannedUnit::binary(
                Operator::Add,
                literal,
                StagedOperand::Literal(0.0),
            ));
            Ok(units.len() - 1)
        }
        Err(_) if text.is_empty() => Err(CalcError::malformed("empty expression or group")),
        Err(_) => Err(CalcError::malformed(format!(
            "expression does not reduce to a single value: '{text}'"
        ))),
    }
}
