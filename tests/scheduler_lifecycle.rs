// tests/scheduler_lifecycle.rs

mod common;
use crate::common::builders::{SchedulerBuilder, drive_to_completion};
use crate::common::{OWNER, evaluate_with, init_tracing, with_timeout};

use std::sync::Arc;
use std::time::{Duration, Instant};

use calcdag::errors::CalcError;
use calcdag::scheduler::WorkArgs;
use calcdag::types::{ExpressionStatus, OwnerId, UnitId, UnitStatus};

#[test]
fn result_for_a_unit_not_in_progress_is_a_conflict() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().build();
    let id = scheduler.submit(OWNER, "(1+2)*3").unwrap();
    let before = scheduler.units_of(id).unwrap();

    // Still waiting.
    let err = scheduler.submit_result(UnitId(2), 9.0).unwrap_err();
    assert!(matches!(err, CalcError::Conflict { unit: UnitId(2), .. }));
    let err = scheduler.report_failure(UnitId(1), "nope").unwrap_err();
    assert!(matches!(err, CalcError::Conflict { .. }));

    assert_eq!(scheduler.units_of(id).unwrap(), before);
    assert_eq!(scheduler.expression(id).unwrap().status, ExpressionStatus::InProgress);
}

#[test]
fn expression_is_done_exactly_when_every_unit_is_done() {
    let scheduler = SchedulerBuilder::new().build();
    let id = scheduler.submit(OWNER, "(1+2)*(3+4)+5").unwrap();

    while let Some(a) = scheduler.claim_next().unwrap() {
        let expr = scheduler.expression(id).unwrap();
        assert_ne!(expr.status, ExpressionStatus::Done);
        assert_eq!(expr.result, None);

        let WorkArgs::Binary { lhs, rhs } = a.args else {
            panic!("binary unit expected");
        };
        let value = match a.operation.to_string().as_str() {
            "+" => lhs + rhs,
            "*" => lhs * rhs,
            other => panic!("unexpected operator {other}"),
        };
        scheduler.submit_result(a.unit_id, value).unwrap();
    }

    let units = scheduler.units_of(id).unwrap();
    assert!(units.iter().all(|u| u.status == UnitStatus::Done));

    let expr = scheduler.expression(id).unwrap();
    assert_eq!(expr.status, ExpressionStatus::Done);
    assert_eq!(expr.result, units.last().unwrap().result);
    assert_eq!(expr.result, Some(26.0));
}

#[test]
fn division_by_zero_fails_unit_and_expression() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().build();
    let (id, status, result) = evaluate_with(&scheduler, "4+(2*3)/(1-1)");

    assert_eq!(status, ExpressionStatus::Error);
    assert_eq!(result, None);

    let expr = scheduler.expression(id).unwrap();
    assert!(expr.error.as_deref().unwrap_or("").contains("division by zero"));

    let units = scheduler.units_of(id).unwrap();
    let failed: Vec<_> = units.iter().filter(|u| u.status == UnitStatus::Error).collect();
    assert_eq!(failed.len(), 1);
    // The final addition depends on the failed division and never ran.
    assert_eq!(units.last().unwrap().status, UnitStatus::Waiting);
}

#[test]
fn late_sibling_results_do_not_revive_a_failed_expression() {
    let scheduler = SchedulerBuilder::new().build();
    let id = scheduler.submit(OWNER, "(1/0)*(2+2)").unwrap();

    let first = scheduler.claim_next().unwrap().unwrap();
    let second = scheduler.claim_next().unwrap().unwrap();

    // The rightmost group (2+2) was staged first.
    assert_eq!(first.args, WorkArgs::Binary { lhs: 2.0, rhs: 2.0 });
    scheduler.report_failure(second.unit_id, "division by zero").unwrap();
    scheduler.submit_result(first.unit_id, 4.0).unwrap();

    assert_eq!(scheduler.unit(first.unit_id).unwrap().status, UnitStatus::Done);
    let expr = scheduler.expression(id).unwrap();
    assert_eq!(expr.status, ExpressionStatus::Error);
    assert_eq!(expr.result, None);
    assert!(scheduler.claim_next().unwrap().is_none());
}

#[test]
fn malformed_submissions_create_no_units() {
    let scheduler = SchedulerBuilder::new().build();
    for raw in ["123+", "5/*2"] {
        let err = scheduler.submit(OwnerId(9), raw).unwrap_err();
        assert!(matches!(err, CalcError::MalformedExpression(_)), "{raw}");
    }

    let exprs = scheduler.expressions_of(OwnerId(9)).unwrap();
    assert_eq!(exprs.len(), 2);
    for expr in exprs {
        assert_eq!(expr.status, ExpressionStatus::Error);
        assert_eq!(expr.terminal_unit, None);
        assert!(scheduler.units_of(expr.id).unwrap().is_empty());
    }
    assert!(scheduler.claim_next().unwrap().is_none());
    assert!(matches!(scheduler.unit(UnitId(1)), Err(CalcError::UnitNotFound(_))));
}

#[test]
fn crashed_worker_claim_is_reclaimed_after_lease() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().lease(Duration::from_millis(500)).build();
    let id = scheduler.submit(OWNER, "6*7").unwrap();

    let t0 = Instant::now();
    let lost = scheduler.claim_next_at(t0).unwrap().unwrap();
    assert!(scheduler.claim_next_at(t0 + Duration::from_millis(100)).unwrap().is_none());

    let retry = scheduler
        .claim_next_at(t0 + Duration::from_millis(600))
        .unwrap()
        .unwrap();
    assert_eq!(retry.unit_id, lost.unit_id);

    scheduler.submit_result(retry.unit_id, 42.0).unwrap();
    // The original holder shows up late.
    assert!(matches!(
        scheduler.submit_result(lost.unit_id, 42.0),
        Err(CalcError::Conflict { .. })
    ));
    assert_eq!(scheduler.expression(id).unwrap().result, Some(42.0));
}

#[test]
fn without_lease_a_claim_is_held_forever() {
    let scheduler = SchedulerBuilder::new().build();
    scheduler.submit(OWNER, "1+1").unwrap();
    let t0 = Instant::now();
    scheduler.claim_next_at(t0).unwrap().unwrap();
    assert!(
        scheduler
            .claim_next_at(t0 + Duration::from_secs(3600))
            .unwrap()
            .is_none()
    );
}

#[test]
fn whole_mode_evaluates_in_one_unit() {
    let scheduler = SchedulerBuilder::new().whole().build();
    let (id, status, result) = evaluate_with(&scheduler, "(2+3)*(4-1)");
    assert_eq!(status, ExpressionStatus::Done);
    assert_eq!(result, Some(15.0));
    assert_eq!(scheduler.units_of(id).unwrap().len(), 1);

    let (_, status, _) = evaluate_with(&scheduler, "1/(2-2)");
    assert_eq!(status, ExpressionStatus::Error);

    assert!(matches!(
        scheduler.submit(OWNER, "5/*2"),
        Err(CalcError::MalformedExpression(_))
    ));
}

#[test]
fn queries_are_scoped_to_the_owner() {
    let scheduler = SchedulerBuilder::new().build();
    let mine = scheduler.submit(OwnerId(1), "1+1").unwrap();
    let theirs = scheduler.submit(OwnerId(2), "2+2").unwrap();
    drive_to_completion(&scheduler).unwrap();

    let listed: Vec<_> = scheduler
        .expressions_of(OwnerId(1))
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(listed, vec![mine]);

    assert_eq!(
        scheduler.expression_for_owner(OwnerId(2), theirs).unwrap().result,
        Some(4.0)
    );
    assert!(matches!(
        scheduler.expression_for_owner(OwnerId(1), theirs),
        Err(CalcError::ExpressionNotFound(_))
    ));
}

#[tokio::test]
async fn wait_for_returns_once_the_expression_finishes() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().build();
    let id = scheduler.submit(OWNER, "2*(3+4)").unwrap();

    let waiter = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.wait_for(id).await })
    };
    tokio::task::yield_now().await;

    drive_to_completion(&scheduler).unwrap();
    let expr = with_timeout(waiter).await.unwrap().unwrap();
    assert_eq!(expr.status, ExpressionStatus::Done);
    assert_eq!(expr.result, Some(14.0));
}
