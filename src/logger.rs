//! Logging setup for the `wtfit` binary and for hosts embedding the engine.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application.

use tracing::Level;

/// Initialize a fmt subscriber at INFO, overridable through `RUST_LOG`.
///
/// ```no_run
/// wtfit_rs::init_logger();
/// tracing::info!("fit started");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize a fmt subscriber with a custom default level.
///
/// `RUST_LOG` still takes precedence, e.g. `RUST_LOG=wtfit_rs=debug` to see
/// every accepted and rejected step. Calling this twice is a no-op.
pub fn init_logger_with_level(default_level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .try_init();
}
