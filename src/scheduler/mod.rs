// src/scheduler/mod.rs

//! Unit dispatch and expression completion.
//!
//! - [`core`] is the [`Scheduler`] itself.
//! - [`state`] holds the pure claim / conflict / finalization rules.
//! - [`assignment`] is what a worker receives for a claimed unit.

pub mod assignment;
pub mod core;
pub mod state;

pub use assignment::{TaskAssignment, WorkArgs};
pub use core::{Scheduler, SchedulerOptions};
