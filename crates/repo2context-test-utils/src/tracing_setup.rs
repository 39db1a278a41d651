//! Tracing for tests that do not use `test-log`.
//!
//! [`init_test_tracing`] routes engine events to the harness writer so they
//! show up next to a failing assertion. Initialisation happens at most once
//! per process; later calls do nothing.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset: per-file decisions from the
/// engine, warnings from everything else.
const DEFAULT_DIRECTIVE: &str = "warn,repo2context_core=debug";

/// Install a subscriber writing to the test harness.
///
/// ```ignore
/// #[tokio::test]
/// async fn run_is_logged() {
///     repo2context_test_utils::tracing_setup::init_test_tracing();
///     // engine debug! lines are captured with the test output
/// }
/// ```
pub fn init_test_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .try_init();
}
