// tests/decomposition.rs

mod common;
use crate::common::builders::SchedulerBuilder;
use crate::common::{OWNER, evaluate_with, init_tracing};

use calcdag::errors::CalcError;
use calcdag::grammar::validate_input;
use calcdag::planner::{self, StagedOperand};
use calcdag::types::{ExpressionStatus, Operation, Operator};

#[test]
fn flat_expressions_follow_standard_precedence() {
    init_tracing();
    let cases = [
        ("2+2*2", 6.0),
        ("8/4/2", 1.0),
        ("10-4-3", 3.0),
        ("1+2*3-4/2", 5.0),
        ("7", 7.0),
    ];
    for (raw, expected) in cases {
        assert_eq!(planner::evaluate(raw).unwrap(), expected, "{raw}");
    }
}

#[test]
fn parenthesised_group_becomes_its_own_unit() {
    let plan = planner::plan("(2+3)*4").unwrap();
    assert_eq!(plan.len(), 2);

    let units = plan.units();
    assert_eq!(units[0].operation, Operation::Binary(Operator::Add));
    assert_eq!(units[1].operation, Operation::Binary(Operator::Mul));
    assert_eq!(units[1].lhs, StagedOperand::Staged(0));
    assert_eq!(units[1].rhs, StagedOperand::Literal(4.0));
    assert_eq!(plan.evaluate().unwrap(), 20.0);
}

#[test]
fn nested_parentheses() {
    assert_eq!(planner::evaluate("((1+2)*3)").unwrap(), 9.0);
    assert_eq!(planner::evaluate("(2+3)*(4-1)").unwrap(), 15.0);
    assert_eq!(planner::evaluate("2*(3+(4-1)*2)").unwrap(), 18.0);
}

#[test]
fn unary_minus() {
    assert_eq!(planner::evaluate("-2+3").unwrap(), 1.0);
    assert_eq!(planner::evaluate("2+-3").unwrap(), -1.0);
    assert_eq!(planner::evaluate("2--2").unwrap(), 4.0);
    assert_eq!(planner::evaluate("2*-3").unwrap(), -6.0);
    assert_eq!(planner::evaluate("-(2+3)").unwrap(), -5.0);
}

#[test]
fn malformed_expressions_are_rejected() {
    for raw in ["123+", "5/*2", "(1+2", "1+2)", "", "2+x"] {
        assert!(
            matches!(planner::plan(raw), Err(CalcError::MalformedExpression(_))),
            "{raw:?} should be malformed"
        );
    }
}

#[test]
fn pathologically_deep_input_is_rejected_not_crashed() {
    let depth = 100_000;
    let nested = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    validate_input(&nested).unwrap();
    assert!(matches!(
        planner::evaluate(&nested),
        Err(CalcError::MalformedExpression(_))
    ));

    let chained = format!("2*{}3", "-".repeat(depth));
    assert!(matches!(
        planner::plan(&chained),
        Err(CalcError::MalformedExpression(_))
    ));

    let scheduler = SchedulerBuilder::new().build();
    let err = scheduler.submit(OWNER, &nested).unwrap_err();
    assert!(matches!(err, CalcError::MalformedExpression(_)));

    let reasonable = format!("{}2*3{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(planner::evaluate(&reasonable).unwrap(), 6.0);
}

#[test]
fn scheduled_evaluation_matches_direct_evaluation() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().build();

    for raw in ["2+2*2", "(2+3)*4", "((1+2)*3)", "(2+3)*(4-1)", "2--2", "-2+3", "42"] {
        let (_, status, result) = evaluate_with(&scheduler, raw);
        assert_eq!(status, ExpressionStatus::Done, "{raw}");
        assert_eq!(result, Some(planner::evaluate(raw).unwrap()), "{raw}");
    }
}

#[test]
fn terminal_unit_is_the_last_one_created() {
    let scheduler = SchedulerBuilder::new().build();
    let id = scheduler.submit(common::OWNER, "(2+3)*(4-1)+6/2").unwrap();

    let expr = scheduler.expression(id).unwrap();
    let units = scheduler.units_of(id).unwrap();
    assert_eq!(expr.terminal_unit, units.last().map(|u| u.id));

    // Every reference points at a smaller id.
    for unit in &units {
        assert!(unit.dependencies().all(|dep| dep < unit.id));
    }
}
