//! Error types for fob-lambda operations.
//!
//! Only fatal conditions live here. Compilation diagnostics reported by the
//! engine are captured in [`BuildResult`](crate::BuildResult) instead, and a
//! directory candidate that fails its probe is skipped without an error.

use std::path::PathBuf;

/// Fatal errors that reject a build.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request or the (transformed) configuration is malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An explicitly named entrypoint could not be probed.
    #[error("Entrypoint not found: {} ({reason})", .path.display())]
    EntryNotFound { path: PathBuf, reason: String },

    /// Two entries resolve to the same output file.
    #[error("Duplicate output name '{name}' (from {} and {})", .first.display(), .second.display())]
    DuplicateOutput {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Output name that is absolute or escapes the output directory.
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// The caller-supplied configuration transformer failed.
    #[error("Configuration transformer failed: {0}")]
    Transformer(#[source] anyhow::Error),

    /// The compilation engine rejected its configuration or could not run.
    #[error("Compilation engine error: {0}")]
    Engine(String),

    /// An emitted file could not be written.
    #[error("Write failure: {0}")]
    Write(String),

    /// A deployment archive could not be written.
    #[error("Failed to archive {}: {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },

    /// Settings could not be extracted.
    #[error("Settings error: {0}")]
    Settings(#[from] Box<figment::Error>),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fob-lambda operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Self {
        Error::Settings(Box::new(error))
    }
}

impl Error {
    /// Whether this error was raised before the compiler was invoked because of
    /// a malformed request or configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::EntryNotFound { .. }
                | Error::DuplicateOutput { .. }
                | Error::InvalidOutputPath(_)
        )
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "INVALID_CONFIG",
            Error::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            Error::DuplicateOutput { .. } => "DUPLICATE_OUTPUT",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::Transformer(_) => "TRANSFORMER_FAILED",
            Error::Engine(_) => "ENGINE_ERROR",
            Error::Write(_) => "WRITE_FAILURE",
            Error::Archive { .. } => "ARCHIVE_FAILURE",
            Error::Settings(_) => "SETTINGS_ERROR",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::EntryNotFound { path, .. } => Some(Box::new(format!(
                "Check that '{}' exists and is readable.",
                path.display()
            ))),
            Error::DuplicateOutput { name, .. } => Some(Box::new(format!(
                "Give one of the entries a custom name with the 'path:name' notation, e.g. 'src/handler.js:{}'.",
                alternative_name(name)
            ))),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output name '{}' must be relative and stay inside the output directory.",
                path
            ))),
            Error::Transformer(_) => Some(Box::new(
                "The configuration transformer returned an error; the build was aborted before compilation.",
            )),
            Error::Write(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            Error::Archive { .. } => Some(Box::new(
                "Check that the output directory is writable and no directory shadows the archive path.",
            )),
            _ => None,
        }
    }
}

fn alternative_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-2.{ext}"),
        None => format!("{name}-2"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_configuration_classification() {
        assert!(Error::Config("x".into()).is_configuration());
        assert!(
            Error::EntryNotFound {
                path: PathBuf::from("a.js"),
                reason: "missing".into()
            }
            .is_configuration()
        );
        assert!(!Error::Engine("boom".into()).is_configuration());
        assert!(!Error::Transformer(anyhow::anyhow!("nope")).is_configuration());
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = Error::Archive {
            path: PathBuf::from("out/a.js.zip"),
            reason: "denied".into(),
        };
        assert_eq!(err.code().unwrap().to_string(), "ARCHIVE_FAILURE");
        assert!(err.help().is_some());
    }

    #[test]
    fn test_duplicate_help_suggests_name() {
        let err = Error::DuplicateOutput {
            name: "handler.js".into(),
            first: PathBuf::from("/a/handler.js"),
            second: PathBuf::from("/b/handler.js"),
        };
        let help = err.help().unwrap().to_string();
        assert!(help.contains("handler-2.js"), "{help}");
    }
}
