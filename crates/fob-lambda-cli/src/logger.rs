//! Tracing subscriber setup for the CLI.
//!
//! Level selection, first match wins:
//!
//! 1. `--verbose`: debug for fob-lambda crates
//! 2. `--quiet`: errors only for fob-lambda crates
//! 3. `RUST_LOG`
//! 4. info for fob-lambda crates

use fob_lambda::LogLevel;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(fmt_layer)
        .init();
}

fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    let level = LogLevel::from_flags(verbose, quiet);
    if verbose || quiet {
        return EnvFilter::new(directives(level));
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)))
}

fn directives(level: LogLevel) -> String {
    format!("fob_lambda={level},fob_lambda_cli={level}")
}
