//! Shared fixtures for winedeck's integration tests: tracing setup, fake
//! OS seams and config builders.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Upper bound for any single awaited step in a test.
pub const TEST_DEADLINE: Duration = Duration::from_secs(10);

/// Install a test-writer subscriber once per test binary.
///
/// Honours `WINEDECK_LOG` like the binary does, e.g.
/// `WINEDECK_LOG=winedeck::detect=debug cargo test --test detector`.
/// Output is only shown for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(winedeck::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn,winedeck=info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_DEADLINE`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_DEADLINE, f)
        .await
        .expect("test step exceeded its deadline")
}

/// Poll `condition` every few milliseconds until it holds.
///
/// For state that background tasks (sweepers, detached launches) change
/// after the call under test has already returned.
pub async fn eventually(condition: impl Fn() -> bool) {
    with_timeout(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}
