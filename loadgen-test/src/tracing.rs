//! Log capture for tests.

use tracing_subscriber::EnvFilter;

const CRATE_NAMES: &[&str] = &["loadgen", "loadgen_test"];

/// Initialize the logger for testing.
///
/// Logs go to the output captured by the Rust test runner. Unless `RUST_LOG` is set, only the
/// load generator crates are logged, at maximum verbosity. Calling this more than once is a no-op.
///
/// # Example
///
/// ```
/// loadgen_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        CRATE_NAMES
            .iter()
            .fold(EnvFilter::new("ERROR"), |filter, name| {
                filter.add_directive(format!("{name}=TRACE").parse().unwrap())
            })
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
