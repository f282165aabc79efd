use tracing_subscriber::EnvFilter;

/// Initialize the process-wide `tracing` subscriber, reading verbosity from
/// `RUST_LOG` and defaulting to `info`. Matches the logging setup used by
/// every binary in this codebase.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
