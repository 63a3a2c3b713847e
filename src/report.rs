// src/report.rs

//! What the binary prints.

use std::io::{self, Write};

use serde::Serialize;

use crate::planner::Plan;
use crate::store::Expression;
use crate::types::{ExpressionId, ExpressionStatus};

/// Final state of one command-line expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub expression: String,
    /// `None` when the input never reached the scheduler.
    pub id: Option<ExpressionId>,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn rejected(raw: &str, error: impl ToString) -> Self {
        Self {
            expression: raw.to_string(),
            id: None,
            status: ExpressionStatus::Error,
            result: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_expression(expression: Expression) -> Self {
        Self {
            expression: expression.raw,
            id: Some(expression.id),
            status: expression.status,
            result: expression.result,
            error: expression.error,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == ExpressionStatus::Done
    }
}

/// One line per outcome: `<id> <status> <result|error>  <expression>`.
pub fn write_text(out: &mut impl Write, outcomes: &[Outcome]) -> io::Result<()> {
    for o in outcomes {
        let id = o.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
        let value = match (o.result, &o.error) {
            (Some(v), _) => v.to_string(),
            (None, Some(err)) => err.clone(),
            (None, None) => "-".to_string(),
        };
        writeln!(out, "{id} {} {value}  {}", o.status, o.expression)?;
    }
    Ok(())
}

pub fn write_json(out: &mut impl Write, outcomes: &[Outcome]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, outcomes)?;
    writeln!(out)
}

/// Dry-run listing of a plan, one unit per line.
pub fn write_plan(out: &mut impl Write, raw: &str, plan: &Plan) -> io::Result<()> {
    writeln!(out, "{raw}")?;
    let waves = plan.waves();
    for (idx, unit) in plan.units().iter().enumerate() {
        let marker = if idx == plan.terminal() { "  (terminal)" } else { "" };
        writeln!(
            out,
            "  T{idx} = {} {} {}    wave {}{marker}",
            unit.lhs, unit.operation, unit.rhs, waves[idx]
        )?;
    }
    Ok(())
}
