// src/agent/compute.rs

use crate::errors::{CalcError, Result};
use crate::grammar::apply_operator;
use crate::planner;
use crate::scheduler::{TaskAssignment, WorkArgs};
use crate::types::Operation;

/// Perform the arithmetic an assignment asks for.
pub fn compute(assignment: &TaskAssignment) -> Result<f64> {
    match (assignment.operation, &assignment.args) {
        (Operation::Binary(op), WorkArgs::Binary { lhs, rhs }) => apply_operator(op, *lhs, *rhs),
        (Operation::Whole, WorkArgs::Whole { expression }) => planner::evaluate(expression),
        (operation, _) => Err(CalcError::ExecutionError(format!(
            "unit {} carries arguments that do not fit operation {operation}",
            assignment.unit_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpressionId, Operator, UnitId};

    fn assignment(operation: Operation, args: WorkArgs) -> TaskAssignment {
        TaskAssignment {
            unit_id: UnitId(1),
            expression_id: ExpressionId::new(),
            operation,
            args,
            operation_time_ms: 0,
        }
    }

    #[test]
    fn binary_and_whole_work() {
        let sub = assignment(
            Operation::Binary(Operator::Sub),
            WorkArgs::Binary { lhs: 2.0, rhs: 5.0 },
        );
        assert_eq!(compute(&sub).unwrap(), -3.0);

        let whole = assignment(
            Operation::Whole,
            WorkArgs::Whole {
                expression: "(2+3)*-4".into(),
            },
        );
        assert_eq!(compute(&whole).unwrap(), -20.0);
    }

    #[test]
    fn division_by_zero_is_an_execution_error() {
        let div = assignment(
            Operation::Binary(Operator::Div),
            WorkArgs::Binary { lhs: 1.0, rhs: 0.0 },
        );
        assert!(matches!(compute(&div), Err(CalcError::ExecutionError(_))));
    }

    #[test]
    fn mismatched_arguments_are_rejected() {
        let odd = assignment(
            Operation::Whole,
            WorkArgs::Binary { lhs: 1.0, rhs: 1.0 },
        );
        assert!(matches!(compute(&odd), Err(CalcError::ExecutionError(_))));
    }
}
