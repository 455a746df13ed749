use tracing_subscriber::{fmt, EnvFilter};

/// Initialize structured logging with environment filter.
/// Set RIPPLE_LOG=debug (or trace, info, warn, error) for verbosity control.
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Like [`init_logging`] but returns false if a global subscriber is
/// already installed. Suitable for test binaries where several entry
/// points race to initialize.
pub fn try_init_logging() -> bool {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("RIPPLE_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}
