//! Aggregated outcome of a build.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::compiler::{CompilerOutput, EmittedBundle};
use crate::diagnostics::Diagnostic;

/// Outcome of a build that was not rejected.
///
/// A build with compilation errors still resolves; inspect
/// [`has_errors`](Self::has_errors) before trusting the bundles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    diagnostics: Vec<Diagnostic>,
    bundles: Vec<EmittedBundle>,
    files: Vec<PathBuf>,
    archives: Vec<PathBuf>,
}

impl BuildResult {
    pub fn from_output(output: CompilerOutput) -> Self {
        Self {
            diagnostics: output.diagnostics,
            bundles: output.bundles,
            files: output.files,
            archives: Vec::new(),
        }
    }

    /// Whether any entry of the batch failed to compile.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn bundles(&self) -> &[EmittedBundle] {
        &self.bundles
    }

    /// Look up a bundle by its output name.
    pub fn bundle(&self, name: &str) -> Option<&EmittedBundle> {
        self.bundles.iter().find(|bundle| bundle.name == name)
    }

    /// Every file the compiler wrote.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Archives created for this build, empty unless zipping was requested.
    pub fn archives(&self) -> &[PathBuf] {
        &self.archives
    }

    pub(crate) fn with_archives(mut self, archives: Vec<PathBuf>) -> Self {
        self.archives = archives;
        self
    }
}
