//! Build orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use tracing::{Instrument, Level, debug, enabled, info, info_span, trace};

use crate::archive;
use crate::compiler::{Compiler, RolldownCompiler};
use crate::config::{CompilationConfig, ConfigFactory, NodeVersion};
use crate::entry::EntrypointResolver;
use crate::fs::{FileSystem, NativeFs};
use crate::request::BuildRequest;
use crate::result::BuildResult;
use crate::settings::Settings;
use crate::transform;
use crate::{Error, Result};

/// Runs builds against injected collaborators.
///
/// Holds no per-build state, so one bundler can serve concurrent builds into
/// distinct output directories.
#[derive(Debug, Clone)]
pub struct LambdaBundler {
    fs: Arc<dyn FileSystem>,
    compiler: Arc<dyn Compiler>,
    settings: Settings,
}

impl Default for LambdaBundler {
    fn default() -> Self {
        Self {
            fs: Arc::new(NativeFs::new()),
            compiler: Arc::new(RolldownCompiler::new()),
            settings: Settings::default(),
        }
    }
}

impl LambdaBundler {
    /// Native filesystem, Rolldown, default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`new`](Self::new), with settings loaded from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_settings(Settings::load()?))
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve, configure, transform, compile and optionally archive.
    ///
    /// Resolves with a [`BuildResult`] even when entries fail to compile.
    ///
    /// # Errors
    ///
    /// Rejects, without compiling, on configuration errors (missing entries,
    /// duplicate or escaping output names, unsupported runtime version) and
    /// when the transformer fails. Also rejects when the engine cannot run,
    /// when output cannot be written and when archiving fails.
    pub async fn build(&self, request: BuildRequest) -> Result<BuildResult> {
        let span = info_span!("lambda_build", service = %request.service_name);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: BuildRequest) -> Result<BuildResult> {
        debug!(request = ?request, "request received");

        let cwd = self
            .fs
            .current_dir()
            .map_err(|e| Error::Config(format!("cannot determine working directory: {}", e)))?;

        let entries = EntrypointResolver::new(self.fs.as_ref(), &cwd)
            .resolve(&request.entrypoints)
            .await?;
        debug!(count = entries.len(), "entries resolved");

        let config = self.create_config(&request, &cwd, &entries)?;
        debug!(
            output = %config.output_path.display(),
            node = %config.target.node,
            mode = %config.mode,
            "config built"
        );

        let config = transform::apply(request.config_transformer.as_ref(), config)?;
        debug!(
            entries = config.entries.len(),
            externals = config.externals.len(),
            "config transformed"
        );
        if enabled!(Level::TRACE) {
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                trace!(config = %json, "final config");
            }
        }

        info!(entries = config.entries.len(), "compiling");
        let output = self.compiler.compile(&config).await?;
        let mut result = BuildResult::from_output(output);
        debug!(
            bundles = result.bundles().len(),
            errors = result.errors().count(),
            "compiled"
        );

        if request.zip.unwrap_or(self.settings.zip) {
            let archives = archive::archive_bundles(&config.output_path, result.bundles()).await?;
            debug!(count = archives.len(), "archived");
            result = result.with_archives(archives);
        }

        info!(
            bundles = result.bundles().len(),
            errors = result.errors().count(),
            warnings = result.warnings().count(),
            "build finished"
        );
        Ok(result)
    }

    fn create_config(
        &self,
        request: &BuildRequest,
        cwd: &Path,
        entries: &[crate::EntryDescriptor],
    ) -> Result<CompilationConfig> {
        let output_path = match &request.output_path {
            Some(path) => absolute(cwd, path),
            None => cwd.to_path_buf(),
        };

        let node_version = match request.node_version.as_deref() {
            Some(version) => NodeVersion::parse(version)?,
            None => self.settings.node_version.clone().unwrap_or_default(),
        };

        ConfigFactory::new(request.service_name.clone())
            .context(cwd)
            .output_path(output_path)
            .node_version(node_version)
            .mode(request.mode.unwrap_or(self.settings.mode))
            .create(entries)
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        cwd.join(path).clean()
    }
}

/// Build with the native filesystem, Rolldown and settings from the
/// environment.
///
/// ```no_run
/// # async fn run() -> fob_lambda::Result<()> {
/// use fob_lambda::BuildRequest;
///
/// let result = fob_lambda::build(
///     BuildRequest::new(vec!["src/orders.js", "src/users.ts:users/handler.js"])
///         .output_path("dist")
///         .zip(true),
/// )
/// .await?;
///
/// for bundle in result.bundles() {
///     println!("{}", bundle.path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn build(request: BuildRequest) -> Result<BuildResult> {
    LambdaBundler::from_env()?.build(request).await
}
