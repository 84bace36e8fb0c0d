#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-lambda
//!
//! Package serverless function handlers into standalone deployable bundles.
//!
//! A build resolves its entrypoints (files, `path:customName` overrides or a
//! directory of handlers), assembles one [`CompilationConfig`] for the whole
//! batch, lets an optional [`ConfigTransformer`] rewrite it, compiles every
//! entry in a single Rolldown pass and, on request, zips each bundle for
//! deployment.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fob_lambda::{BuildRequest, CompilationConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let result = fob_lambda::build(
//!     BuildRequest::new("src/handlers")
//!         .output_path("dist")
//!         .node_version("20.18")
//!         .config_transformer(|mut config: CompilationConfig| -> anyhow::Result<CompilationConfig> {
//!             config.externals.externalize("aws-sdk");
//!             Ok(config)
//!         })
//!         .zip(true),
//! )
//! .await?;
//!
//! if result.has_errors() {
//!     for error in result.errors() {
//!         eprintln!("{error}");
//!     }
//! }
//! # Ok(()) }
//! ```
//!
//! ## Custom collaborators
//!
//! [`LambdaBundler`] takes the filesystem, the compiler and the settings as
//! injected values; [`build`] uses the native ones.

pub mod archive;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod entry;
pub mod fs;
pub mod settings;

mod bundler;
mod error;
mod request;
mod result;
mod transform;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use bundler::{LambdaBundler, build};
pub use compiler::{Compiler, CompilerOutput, EmittedBundle, RolldownCompiler};
pub use config::{
    BuildMode, CompilationConfig, ConfigFactory, Externals, Loader, ModuleRule, NodeVersion,
    SUPPORTED_NODE_VERSIONS, TranspileTarget,
};
pub use diagnostics::{Diagnostic, Severity};
pub use entry::{EntryDescriptor, EntrypointResolver, Entrypoints};
pub use error::{Error, Result};
pub use fs::{FileSystem, FsError, FsResult, NativeFs, Probe};
pub use request::BuildRequest;
pub use result::BuildResult;
pub use settings::Settings;
pub use transform::{ConfigTransformer, SharedTransformer};
