// tests/agent_pool.rs

mod common;
use crate::common::builders::{SchedulerBuilder, binary_assignment, fast_agents};
use crate::common::{OWNER, Posted, RecordingSource, init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use calcdag::agent::{AgentPool, LocalTaskSource, TaskSource, run_worker};
use calcdag::config::TimingTable;
use calcdag::types::{ExpressionStatus, Operator, UnitId};

#[tokio::test]
async fn pool_evaluates_submitted_expressions() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().build();
    let source: Arc<dyn TaskSource> = Arc::new(LocalTaskSource::new(Arc::clone(&scheduler)));
    let pool = AgentPool::spawn(source, fast_agents(3));
    assert_eq!(pool.len(), 3);

    let cases = [("2+2*2", Some(6.0)), ("(2+3)*(4-1)", Some(15.0)), ("1/(3-3)", None)];
    let ids: Vec<_> = cases
        .iter()
        .map(|(raw, _)| scheduler.submit(OWNER, raw).unwrap())
        .collect();

    for (id, (raw, expected)) in ids.iter().zip(cases) {
        let expr = with_timeout(scheduler.wait_for(*id)).await.unwrap();
        assert_eq!(expr.result, expected, "{raw}");
        let status = if expected.is_some() {
            ExpressionStatus::Done
        } else {
            ExpressionStatus::Error
        };
        assert_eq!(expr.status, status, "{raw}");
    }

    let stats = with_timeout(pool.shutdown()).await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.rejected, 0);
}

#[tokio::test(start_paused = true)]
async fn worker_sleeps_the_simulated_operation_time() {
    let timing = TimingTable {
        multiplication_ms: 2_000,
        ..TimingTable::instant()
    };
    let scheduler = SchedulerBuilder::new().timing(timing).build();
    let id = scheduler.submit(OWNER, "6*7").unwrap();

    let source: Arc<dyn TaskSource> = Arc::new(LocalTaskSource::new(Arc::clone(&scheduler)));
    let started = tokio::time::Instant::now();
    let pool = AgentPool::spawn(source, fast_agents(1));

    let expr = scheduler.wait_for(id).await.unwrap();
    assert_eq!(expr.result, Some(42.0));
    assert!(started.elapsed() >= Duration::from_millis(2_000));

    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn worker_reports_failures_and_retries_transient_errors() {
    init_tracing();
    let source = Arc::new(RecordingSource::new([
        binary_assignment(1, Operator::Add, 1.0, 2.0),
        binary_assignment(2, Operator::Div, 1.0, 0.0),
        binary_assignment(3, Operator::Mul, 2.0, 5.0),
    ]));
    source.fail_next_posts(2);
    source.mark_stale(UnitId(3));

    let (tx, rx) = watch::channel(false);
    let worker = tokio::spawn(run_worker(
        0,
        Arc::clone(&source) as Arc<dyn TaskSource>,
        fast_agents(1),
        rx,
    ));

    with_timeout(async {
        while source.fetches() < 5 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    tx.send(true).unwrap();
    let stats = with_timeout(worker).await.unwrap();

    let posted = source.posted();
    assert_eq!(posted[0], Posted::Result(UnitId(1), 3.0));
    assert!(matches!(&posted[1], Posted::Failure(UnitId(2), reason) if reason.contains("division by zero")));
    assert_eq!(posted.len(), 2);

    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.rejected, 1);
}

#[tokio::test]
async fn dropping_the_shutdown_sender_stops_idle_workers() {
    let source: Arc<dyn TaskSource> = Arc::new(RecordingSource::default());
    let (tx, rx) = watch::channel(false);
    let worker = tokio::spawn(run_worker(0, source, fast_agents(1), rx));

    tokio::time::sleep(Duration::from_millis(5)).await;
    drop(tx);
    let stats = with_timeout(worker).await.unwrap();
    assert_eq!(stats, Default::default());
}
