//! Process-wide tracing setup shared by the host binaries.

/// Initialize JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init_with_default("info");
}

/// Tracing subscriber configuration.
pub mod tracing;
