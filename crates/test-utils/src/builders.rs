#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use calcdag::agent::{AgentOptions, compute};
use calcdag::config::TimingTable;
use calcdag::errors::Result;
use calcdag::scheduler::{Scheduler, SchedulerOptions, TaskAssignment, WorkArgs};
use calcdag::store::{MemoryStore, TaskStore};
use calcdag::types::{EvaluationMode, ExpressionId, Operation, Operator, UnitId};

/// Builder for a `Scheduler` whose units take no simulated time.
pub struct SchedulerBuilder {
    options: SchedulerOptions,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            options: SchedulerOptions {
                mode: EvaluationMode::Decomposed,
                timing: TimingTable::instant(),
                lease: None,
            },
        }
    }

    pub fn whole(mut self) -> Self {
        self.options.mode = EvaluationMode::Whole;
        self
    }

    pub fn lease(mut self, lease: Duration) -> Self {
        self.options.lease = Some(lease);
        self
    }

    pub fn timing(mut self, timing: TimingTable) -> Self {
        self.options.timing = timing;
        self
    }

    pub fn build(self) -> Arc<Scheduler<MemoryStore>> {
        Arc::new(Scheduler::new(MemoryStore::new(), self.options))
    }

    pub fn build_with<S: TaskStore>(self, store: S) -> Arc<Scheduler<S>> {
        Arc::new(Scheduler::new(store, self.options))
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Agent options suitable for tests: short polls, no backoff.
pub fn fast_agents(workers: usize) -> AgentOptions {
    AgentOptions {
        workers,
        poll_interval: Duration::from_millis(1),
        error_backoff: Duration::from_millis(1),
    }
}

/// A binary assignment that is not backed by any scheduler.
pub fn binary_assignment(unit: u64, op: Operator, lhs: f64, rhs: f64) -> TaskAssignment {
    TaskAssignment {
        unit_id: UnitId(unit),
        expression_id: ExpressionId::new(),
        operation: Operation::Binary(op),
        args: WorkArgs::Binary { lhs, rhs },
        operation_time_ms: 0,
    }
}

/// Claim, compute and report on the calling thread until nothing is ready.
///
/// Returns the number of units processed.
pub fn drive_to_completion<S: TaskStore>(scheduler: &Scheduler<S>) -> Result<usize> {
    let mut processed = 0;
    while let Some(assignment) = scheduler.claim_next()? {
        match compute(&assignment) {
            Ok(value) => scheduler.submit_result(assignment.unit_id, value)?,
            Err(err) => scheduler.report_failure(assignment.unit_id, &err.to_string())?,
        }
        processed += 1;
    }
    Ok(processed)
}
