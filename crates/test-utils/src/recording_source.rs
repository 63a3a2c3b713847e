use std::collections::VecDeque;
use std::sync::Mutex;

use calcdag::agent::{SourceFuture, TaskSource};
use calcdag::errors::CalcError;
use calcdag::scheduler::TaskAssignment;
use calcdag::types::UnitId;

/// What a worker reported back for a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Posted {
    Result(UnitId, f64),
    Failure(UnitId, String),
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<TaskAssignment>,
    posted: Vec<Posted>,
    /// Number of upcoming posts to fail with `StoreUnavailable`.
    failing_posts: usize,
    /// Units whose posts are refused with `Conflict`.
    stale: Vec<UnitId>,
    fetches: usize,
}

/// A scripted [`TaskSource`]:
/// - hands out the queued assignments in order, then `None`
/// - records every result and failure posted back
/// - can inject transient post errors and stale-claim conflicts.
#[derive(Debug, Default)]
pub struct RecordingSource {
    state: Mutex<State>,
}

impl RecordingSource {
    pub fn new(assignments: impl IntoIterator<Item = TaskAssignment>) -> Self {
        Self {
            state: Mutex::new(State {
                queue: assignments.into_iter().collect(),
                ..State::default()
            }),
        }
    }

    pub fn fail_next_posts(&self, n: usize) {
        self.state.lock().unwrap().failing_posts = n;
    }

    pub fn mark_stale(&self, unit: UnitId) {
        self.state.lock().unwrap().stale.push(unit);
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    fn post(&self, posted: Posted) -> calcdag::errors::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_posts > 0 {
            state.failing_posts -= 1;
            return Err(CalcError::StoreUnavailable("injected post failure".into()));
        }
        let unit = match &posted {
            Posted::Result(id, _) | Posted::Failure(id, _) => *id,
        };
        if state.stale.contains(&unit) {
            return Err(CalcError::Conflict {
                unit,
                status: "DONE".into(),
            });
        }
        state.posted.push(posted);
        Ok(())
    }
}

impl TaskSource for RecordingSource {
    fn fetch_task(&self) -> SourceFuture<'_, Option<TaskAssignment>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.fetches += 1;
            Ok(state.queue.pop_front())
        })
    }

    fn post_result(&self, unit_id: UnitId, value: f64) -> SourceFuture<'_, ()> {
        Box::pin(async move { self.post(Posted::Result(unit_id, value)) })
    }

    fn post_failure(&self, unit_id: UnitId, reason: String) -> SourceFuture<'_, ()> {
        Box::pin(async move { self.post(Posted::Failure(unit_id, reason)) })
    }
}
