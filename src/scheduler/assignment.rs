// src/scheduler/assignment.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ExpressionId, Operation, UnitId};

/// Operands handed to a worker, already resolved to values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkArgs {
    Binary { lhs: f64, rhs: f64 },
    /// Raw text of the owning expression.
    Whole { expression: String },
}

/// What a worker receives from a successful claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub unit_id: UnitId,
    pub expression_id: ExpressionId,
    pub operation: Operation,
    pub args: WorkArgs,
    /// Simulated cost; workers sleep this long before computing.
    pub operation_time_ms: u64,
}

impl TaskAssignment {
    pub fn operation_time(&self) -> Duration {
        Duration::from_millis(self.operation_time_ms)
    }
}
