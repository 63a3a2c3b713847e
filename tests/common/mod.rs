#![allow(dead_code, unused_imports)]

pub use calcdag_test_utils::builders;
pub use calcdag_test_utils::flaky_store::FlakyStore;
pub use calcdag_test_utils::recording_source::{Posted, RecordingSource};
pub use calcdag_test_utils::{init_tracing, with_timeout};

use calcdag::scheduler::Scheduler;
use calcdag::store::TaskStore;
use calcdag::types::{ExpressionId, ExpressionStatus, OwnerId};

pub const OWNER: OwnerId = OwnerId(1);

/// Submit, drive synchronously, and return `(status, result)`.
pub fn evaluate_with<S: TaskStore>(
    scheduler: &Scheduler<S>,
    raw: &str,
) -> (ExpressionId, ExpressionStatus, Option<f64>) {
    let id = scheduler.submit(OWNER, raw).expect("submit");
    builders::drive_to_completion(scheduler).expect("drive");
    let expr = scheduler.expression(id).expect("expression");
    (id, expr.status, expr.result)
}
