// src/agent/worker.rs

//! Polling worker loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::agent::compute::compute;
use crate::agent::source::TaskSource;
use crate::config::model::AgentSection;
use crate::errors::{CalcError, Result};
use crate::scheduler::TaskAssignment;

/// Timing knobs shared by every worker of a pool.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Number of workers.
    pub workers: usize,
    /// Sleep when no unit is ready.
    pub poll_interval: Duration,
    /// Sleep after a transient source error.
    pub error_backoff: Duration,
}

impl AgentOptions {
    pub fn from_config(agent: &AgentSection) -> Self {
        Self {
            workers: agent.computing_power,
            poll_interval: agent.poll_interval(),
            error_backoff: agent.error_backoff(),
        }
    }
}

/// Counters reported by a worker when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Units whose result was accepted.
    pub completed: u64,
    /// Units reported as failed.
    pub failed: u64,
    /// Reports the scheduler refused (stale claims).
    pub rejected: u64,
}

impl std::ops::AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.rejected += other.rejected;
    }
}

/// Run one worker until `shutdown` flips to `true` (or its sender is dropped).
///
/// A unit abandoned by shutdown mid-computation stays claimed; with a lease
/// configured, another worker picks it up once the lease runs out.
pub async fn run_worker(
    worker: usize,
    source: Arc<dyn TaskSource>,
    options: AgentOptions,
    mut shutdown: watch::Receiver<bool>,
) -> WorkerStats {
    info!(worker, "worker started");
    let mut stats = WorkerStats::default();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let fetched = tokio::select! {
            _ = shutdown.changed() => break,
            fetched = source.fetch_task() => fetched,
        };

        let assignment = match fetched {
            Ok(Some(assignment)) => assignment,
            Ok(None) => {
                if pause(options.poll_interval, &mut shutdown).await {
                    break;
                }
                continue;
            }
            Err(err) => {
                warn!(worker, error = %err, "failed to fetch a unit; backing off");
                if pause(options.error_backoff, &mut shutdown).await {
                    break;
                }
                continue;
            }
        };

        debug!(
            worker,
            unit_id = %assignment.unit_id,
            operation = %assignment.operation,
            operation_time_ms = assignment.operation_time_ms,
            "working on unit"
        );
        if pause(assignment.operation_time(), &mut shutdown).await {
            break;
        }

        match report(worker, source.as_ref(), &assignment, &options, &mut shutdown).await {
            Reported::Result => stats.completed += 1,
            Reported::Failure => stats.failed += 1,
            Reported::Rejected => stats.rejected += 1,
            Reported::Interrupted => break,
        }
    }

    info!(worker, ?stats, "worker stopped");
    stats
}

enum Reported {
    Result,
    Failure,
    Rejected,
    Interrupted,
}

/// Compute `assignment` and post the outcome, retrying transient errors.
async fn report(
    worker: usize,
    source: &dyn TaskSource,
    assignment: &TaskAssignment,
    options: &AgentOptions,
    shutdown: &mut watch::Receiver<bool>,
) -> Reported {
    let unit_id = assignment.unit_id;
    let outcome = compute(assignment);

    loop {
        let posted: Result<()> = match &outcome {
            Ok(value) => source.post_result(unit_id, *value).await,
            Err(err) => source.post_failure(unit_id, err.to_string()).await,
        };

        match posted {
            Ok(()) => {
                return match &outcome {
                    Ok(value) => {
                        debug!(worker, unit_id = %unit_id, value, "result posted");
                        Reported::Result
                    }
                    Err(err) => {
                        warn!(worker, unit_id = %unit_id, error = %err, "unit failed");
                        Reported::Failure
                    }
                };
            }
            Err(err) if err.is_retryable() => {
                warn!(worker, unit_id = %unit_id, error = %err, "report failed; retrying");
                if pause(options.error_backoff, shutdown).await {
                    return Reported::Interrupted;
                }
            }
            Err(err @ (CalcError::Conflict { .. } | CalcError::UnitNotFound(_))) => {
                warn!(worker, unit_id = %unit_id, error = %err, "report rejected");
                return Reported::Rejected;
            }
            Err(err) => {
                warn!(worker, unit_id = %unit_id, error = %err, "report failed; dropping unit");
                return Reported::Rejected;
            }
        }
    }
}

/// Sleep for `duration`; `true` if shutdown was requested meanwhile.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return *shutdown.borrow();
    }
    let interrupted = tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    };
    interrupted || *shutdown.borrow()
}
