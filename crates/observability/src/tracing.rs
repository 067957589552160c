//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is unset or unparsable.
pub fn filter_or(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the JSON subscriber, writing to stderr so stdout stays free for
/// protocol output.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with_default(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_or(default_directive))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
