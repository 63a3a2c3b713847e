// src/agent/mod.rs

//! In-process computing agents.
//!
//! - [`source`]: the `TaskSource` abstraction workers poll.
//! - [`worker`]: one polling worker loop.
//! - [`pool`]: a fixed number of workers with shared shutdown.
//! - [`compute`]: the arithmetic itself.

pub mod compute;
pub mod pool;
pub mod source;
pub mod worker;

pub use compute::compute;
pub use pool::AgentPool;
pub use source::{LocalTaskSource, SourceFuture, TaskSource};
pub use worker::{AgentOptions, WorkerStats, run_worker};
