//! Logging and observability helpers.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Honors `RUST_LOG` when set; defaults to info-level output for this
/// crate. Safe to call more than once (later calls are no-ops).
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridfed=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}
