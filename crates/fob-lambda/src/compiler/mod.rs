//! Compilation engine seam.
//!
//! The orchestrator hands the final [`CompilationConfig`] to a [`Compiler`]
//! exactly once per build. [`RolldownCompiler`] is the shipped engine; tests
//! substitute recording or failing implementations.

mod engine;
pub mod writer;

pub use engine::RolldownCompiler;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::CompilationConfig;
use crate::diagnostics::Diagnostic;

/// One bundle written for an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedBundle {
    /// Output name relative to the output directory, as in the configuration.
    pub name: String,
    /// Absolute path of the written bundle.
    pub path: PathBuf,
    /// Absolute path of the `.map` sibling, when one was written.
    pub source_map: Option<PathBuf>,
    /// Shared chunks the bundle loads at runtime (absolute paths).
    pub companions: Vec<PathBuf>,
}

/// Everything a single compiler pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOutput {
    /// Errors and warnings for the whole batch.
    pub diagnostics: Vec<Diagnostic>,
    /// Bundles in configuration entry order.
    pub bundles: Vec<EmittedBundle>,
    /// Every file written, bundles included.
    pub files: Vec<PathBuf>,
}

impl CompilerOutput {
    /// Output for a pass that failed before emitting anything.
    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            ..Default::default()
        }
    }
}

/// Compiles every entry of a configuration in one pass.
///
/// Module-level failures (syntax errors, unresolved imports) are reported as
/// error diagnostics in the returned output. `Err` is reserved for failures of
/// the engine itself and for output that could not be written.
#[async_trait]
pub trait Compiler: Send + Sync + std::fmt::Debug {
    async fn compile(&self, config: &CompilationConfig) -> Result<CompilerOutput>;
}
