//! Shared helpers for the `snipexec` test suites: tracing capture, a test
//! deadline, builders for requests/configs/orchestrators, and fake backends.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Upper bound for any single awaited operation in a test.
pub const TEST_DEADLINE: Duration = Duration::from_secs(10);

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness capture. Set `RUST_LOG`
/// (e.g. `RUST_LOG=snipexec=debug`) to see more than warnings.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, panicking if it outlives [`TEST_DEADLINE`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_DEADLINE, fut).await {
        Ok(out) => out,
        Err(_) => panic!("test future still pending after {TEST_DEADLINE:?}"),
    }
}
