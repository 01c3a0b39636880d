//! Logging setup
//!
//! The subscriber is installed once from `main`; everything else only emits
//! through `tracing` macros and spans.
//!
//! Level selection, first match wins:
//! 1. `LOGGING` (e.g. `LOGGING=debug` or a full filter directive)
//! 2. `LOG_LEVEL`
//! 3. `RUST_LOG`
//! 4. `debug` with `--verbose`, otherwise `info`

use tracing_subscriber::EnvFilter;

/// Pick the filter directive from the environment and the verbose flag
pub fn log_filter<F>(lookup: F, verbose: bool) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ["LOGGING", "LOG_LEVEL", "RUST_LOG"]
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| {
            if verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        })
}

/// Install the global fmt subscriber
pub fn init_logging(verbose: bool) {
    let filter = log_filter(|name| std::env::var(name).ok(), verbose);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();
}
