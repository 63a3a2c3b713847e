// src/agent/source.rs

//! Where workers get their units from.
//!
//! Workers talk to a `TaskSource` instead of the scheduler directly. The
//! in-process [`LocalTaskSource`] calls the scheduler; a networked source
//! or a test fake can stand in for it without touching the worker loop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;
use crate::scheduler::{Scheduler, TaskAssignment};
use crate::store::TaskStore;
use crate::types::UnitId;

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The worker side of the claim / report protocol.
pub trait TaskSource: Send + Sync {
    /// Claim the next ready unit. `Ok(None)` means nothing is ready yet.
    fn fetch_task(&self) -> SourceFuture<'_, Option<TaskAssignment>>;

    fn post_result(&self, unit_id: UnitId, value: f64) -> SourceFuture<'_, ()>;

    /// Report that the unit could not be computed.
    fn post_failure(&self, unit_id: UnitId, reason: String) -> SourceFuture<'_, ()>;
}

/// Task source backed by a scheduler in the same process.
#[derive(Debug)]
pub struct LocalTaskSource<S: TaskStore> {
    scheduler: Arc<Scheduler<S>>,
}

impl<S: TaskStore> LocalTaskSource<S> {
    pub fn new(scheduler: Arc<Scheduler<S>>) -> Self {
        Self { scheduler }
    }
}

impl<S: TaskStore> TaskSource for LocalTaskSource<S> {
    fn fetch_task(&self) -> SourceFuture<'_, Option<TaskAssignment>> {
        Box::pin(async move { self.scheduler.claim_next() })
    }

    fn post_result(&self, unit_id: UnitId, value: f64) -> SourceFuture<'_, ()> {
        Box::pin(async move { self.scheduler.submit_result(unit_id, value) })
    }

    fn post_failure(&self, unit_id: UnitId, reason: String) -> SourceFuture<'_, ()> {
        Box::pin(async move { self.scheduler.report_failure(unit_id, &reason) })
    }
}
