use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::BuildMode;
use crate::entry::Entrypoints;
use crate::transform::{ConfigTransformer, SharedTransformer};

/// One build invocation.
///
/// Unset fields fall back to [`Settings`](crate::Settings), then to built-in
/// defaults: the working directory for `output_path`, the lowest supported
/// runtime for `node_version`, production for `mode`, no archives.
#[derive(Clone, Default)]
pub struct BuildRequest {
    pub entrypoints: Entrypoints,
    /// Relative paths are resolved against the working directory.
    pub output_path: Option<PathBuf>,
    pub service_name: String,
    /// Validated when the build starts; unsupported versions reject the build.
    pub node_version: Option<String>,
    pub mode: Option<BuildMode>,
    pub config_transformer: Option<SharedTransformer>,
    pub zip: Option<bool>,
}

impl BuildRequest {
    pub fn new(entrypoints: impl Into<Entrypoints>) -> Self {
        Self {
            entrypoints: entrypoints.into(),
            ..Default::default()
        }
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn node_version(mut self, version: impl Into<String>) -> Self {
        self.node_version = Some(version.into());
        self
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn config_transformer(mut self, transformer: impl ConfigTransformer + 'static) -> Self {
        self.config_transformer = Some(Arc::new(transformer));
        self
    }

    pub fn zip(mut self, zip: bool) -> Self {
        self.zip = Some(zip);
        self
    }
}

impl fmt::Debug for BuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRequest")
            .field("entrypoints", &self.entrypoints)
            .field("output_path", &self.output_path)
            .field("service_name", &self.service_name)
            .field("node_version", &self.node_version)
            .field("mode", &self.mode)
            .field("config_transformer", &self.config_transformer.is_some())
            .field("zip", &self.zip)
            .finish()
    }
}
