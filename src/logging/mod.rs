//! Structured logging for the Vextra adapter and kernels.
//!
//! This crate has no log sinks of its own to configure (that is the host
//! application's job); it only initializes `tracing` so that dispatch
//! decisions (kernel selection, GPU preparation, routing calls, swallowed
//! GPU failures) are observable when a host opts in.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize logging with default configuration.
///
/// Sets up structured logging with:
/// - stderr output
/// - environment-based level filtering (`RUST_LOG`)
pub fn init_logging() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("vextra=debug".parse().unwrap())
        .add_directive("info".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("vextra logging initialized");
}

/// Initialize logging for tests with verbose, captured output.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
