// src/grammar/normalize.rs

//! Whitespace stripping and unary-minus rewriting.
//!
//! Rewriting runs exactly once, before decomposition. A unary `-` and the
//! operand it negates become `(0-<operand>)`, so the inserted binary minus
//! keeps its operand scoped regardless of what precedes it:
//!
//! - `-2+3`  -> `(0-2)+3`
//! - `2+-3`  -> `2+(0-3)`
//! - `2--2`  -> `2-(0-2)`
//! - `2*-3`  -> `2*(0-3)`
//!
//! The inserted `-` always follows a `0`, so a second pass is a no-op.

use crate::errors::{CalcError, Result};
use crate::grammar::rules::{is_expression_char, is_operator_char, is_unary_minus};

pub fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Deepest parenthesis nesting accepted after unary-minus rewriting.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Strip whitespace, reject foreign characters, and rewrite unary minus.
pub fn normalize(raw: &str) -> Result<String> {
    let stripped = strip_whitespace(raw);
    if stripped.is_empty() {
        return Err(CalcError::malformed("empty expression"));
    }
    if let Some(bad) = stripped.chars().find(|c| !is_expression_char(*c)) {
        return Err(CalcError::malformed(format!("unexpected character '{bad}'")));
    }
    let rewritten = rewrite_unary_minus(&stripped);
    let depth = nesting_depth(&rewritten);
    if depth > MAX_NESTING_DEPTH {
        return Err(CalcError::malformed(format!(
            "nesting depth {depth} exceeds {MAX_NESTING_DEPTH}"
        )));
    }
    Ok(rewritten)
}

/// What an emitted `(` is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    /// A group copied from the input; closed by its own `)`.
    Group,
    /// An inserted `(0-`; closed once its operand is complete.
    Negation,
}

pub fn rewrite_unary_minus(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut open: Vec<Open> = Vec::new();
    // Set right after `(0-` is emitted.
    let mut negating = false;
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let prev = pos.checked_sub(1).map(|i| chars[i]);

        if negating {
            negating = false;
            match c {
                '-' => {
                    out.push_str("(0-");
                    open.push(Open::Negation);
                    negating = true;
                    pos += 1;
                }
                '(' => {
                    out.push('(');
                    open.push(Open::Group);
                    pos += 1;
                }
                c if is_operator_char(c) || c == ')' => {
                    // Empty operand; the decomposer reports it.
                    close_negations(&mut open, &mut out);
                }
                _ => {
                    while pos < chars.len()
                        && !is_operator_char(chars[pos])
                        && chars[pos] != '('
                        && chars[pos] != ')'
                    {
                        out.push(chars[pos]);
                        pos += 1;
                    }
                    close_negations(&mut open, &mut out);
                }
            }
            continue;
        }

        match c {
            '-' if is_unary_minus(prev) => {
                out.push_str("(0-");
                open.push(Open::Negation);
                negating = true;
            }
            '(' => {
                out.push('(');
                open.push(Open::Group);
            }
            ')' if open.last() == Some(&Open::Group) => {
                out.push(')');
                open.pop();
                close_negations(&mut open, &mut out);
            }
            _ => out.push(c),
        }
        pos += 1;
    }

    // Unclosed groups stay unclosed for the decomposer to reject; pending
    // negations are still closed.
    while let Some(frame) = open.pop() {
        if frame == Open::Negation {
            out.push(')');
        }
    }
    out
}

/// Close every negation whose operand has just been emitted.
fn close_negations(open: &mut Vec<Open>, out: &mut String) {
    while open.last() == Some(&Open::Negation) {
        open.pop();
        out.push(')');
    }
}

fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}
