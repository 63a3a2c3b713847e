// src/planner/mod.rs

//! Expression decomposition.
//!
//! - [`decompose`] turns infix text into a DAG of binary-operation units.
//! - [`plan`] holds the staged result, which the scheduler commits to the
//!   store in a single transaction.

pub mod decompose;
pub mod plan;

pub use decompose::plan;
pub use plan::{Plan, PlannedUnit, StagedOperand};

use crate::errors::Result;

/// Evaluate an expression in one shot, with the same grammar the
/// decomposer uses.
pub fn evaluate(raw: &str) -> Result<f64> {
    plan(raw)?.evaluate()
}
