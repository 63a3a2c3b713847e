// src/grammar/mod.rs

//! Grammar rules shared by the decomposer and the direct evaluator.
//!
//! - [`rules`] classifies characters, operator precedence and token shapes.
//! - [`normalize`] strips whitespace and rewrites unary minus.
//! - [`validate`] is the submission-time input check.

pub mod normalize;
pub mod rules;
pub mod validate;

pub use normalize::{normalize, rewrite_unary_minus, strip_whitespace};
pub use rules::{Precedence, apply_operator, is_operator_char, is_unary_minus, parse_literal};
pub use validate::validate_input;
