//! CLI errors and their conversion to miette reports.

use miette::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// The build was rejected before or after compilation.
    #[error(transparent)]
    Build(#[from] fob_lambda::Error),

    /// The build ran, but some entries failed to compile.
    #[error("{errors} compilation error(s)")]
    CompilationFailed { errors: usize },
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Convert a CLI error into a report for the terminal.
pub fn into_report(err: CliError) -> Report {
    match err {
        CliError::Build(e) => Report::new(e),
        CliError::CompilationFailed { errors } => miette::miette!(
            help = "See the diagnostics above for the failing modules.",
            "Build failed with {} compilation error(s)",
            errors
        ),
    }
}
