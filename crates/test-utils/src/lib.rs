pub mod builders;
pub mod flaky_store;
pub mod recording_source;

use std::sync::Once;

use calcdag::logging::{LOG_ENV, env_filter};
use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Install a subscriber that writes into the test harness's captured output.
///
/// Reads the same `CALCDAG_LOG` directives as the binary, e.g.
/// `CALCDAG_LOG=calcdag::scheduler=debug`. Captured output is only shown for
/// failing tests unless `--nocapture` is passed.
pub fn init_tracing() {
    INIT.call_once(|| {
        let directives = std::env::var(LOG_ENV).ok();
        fmt()
            .with_env_filter(env_filter(None, directives.as_deref()))
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
