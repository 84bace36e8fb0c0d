//! Entrypoint resolution.
//!
//! Turns the caller's entrypoint specification into an ordered list of
//! [`EntryDescriptor`]s. Each string may carry an output name override with the
//! `path:customName` notation, and any entry naming a directory is expanded into
//! the handlers found directly inside it.
//!
//! Directory expansion probes every candidate on its own. A candidate whose
//! probe fails (permissions, dangling symlinks, transient I/O errors) is skipped
//! and the remaining candidates are still resolved.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::check_output_names;
use crate::fs::{FileSystem, Probe};
use crate::{Error, Result};

/// Extensions picked up when expanding a directory.
const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "mts", "cts"];

/// Extensions whose bundles are renamed to `.js`.
const TYPED_EXTENSIONS: &[&str] = &["ts", "mts", "cts"];

/// Handler files probed inside a sub-directory of an expanded directory.
const INDEX_CANDIDATES: &[&str] = &["index.js", "index.ts"];

/// One compilation root and where its bundle goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDescriptor {
    /// Absolute path of the source file.
    pub source_path: PathBuf,
    /// Bundle path relative to the output directory, `/`-separated.
    pub output_name: String,
}

impl EntryDescriptor {
    pub fn new(source_path: impl Into<PathBuf>, output_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            output_name: output_name.into(),
        }
    }
}

/// Entrypoint specification of a build request.
///
/// Any string may name a file (optionally as `path:customName`) or a
/// directory to expand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entrypoints {
    /// Single path.
    Single(String),
    /// Ordered list of paths.
    List(Vec<String>),
}

impl Entrypoints {
    /// Raw entry strings in request order.
    pub fn specs(&self) -> Vec<&str> {
        match self {
            Entrypoints::Single(spec) => vec![spec.as_str()],
            Entrypoints::List(specs) => specs.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for Entrypoints {
    fn default() -> Self {
        Entrypoints::List(Vec::new())
    }
}

impl From<&str> for Entrypoints {
    fn from(spec: &str) -> Self {
        Entrypoints::Single(spec.to_string())
    }
}

impl From<String> for Entrypoints {
    fn from(spec: String) -> Self {
        Entrypoints::Single(spec)
    }
}

impl From<&Path> for Entrypoints {
    fn from(path: &Path) -> Self {
        Entrypoints::Single(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Entrypoints {
    fn from(path: PathBuf) -> Self {
        Entrypoints::from(path.as_path())
    }
}

impl From<Vec<String>> for Entrypoints {
    fn from(specs: Vec<String>) -> Self {
        Entrypoints::List(specs)
    }
}

impl From<Vec<&str>> for Entrypoints {
    fn from(specs: Vec<&str>) -> Self {
        Entrypoints::List(specs.into_iter().map(String::from).collect())
    }
}

/// A parsed entry string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntrySpec {
    pub path: String,
    pub custom_name: Option<String>,
}

/// Split `path:customName`.
///
/// The split happens at the last `:`. The suffix is only an override when it is
/// non-empty, and a bare drive letter prefix (`C:\...`) is never split.
pub(crate) fn parse_entry_spec(raw: &str) -> EntrySpec {
    if let Some((path, name)) = raw.rsplit_once(':') {
        let is_drive = path.len() == 1 && path.chars().all(|c| c.is_ascii_alphabetic());
        if !path.is_empty() && !name.is_empty() && !is_drive && !name.contains('\\') {
            return EntrySpec {
                path: path.to_string(),
                custom_name: Some(name.to_string()),
            };
        }
    }
    EntrySpec {
        path: raw.to_string(),
        custom_name: None,
    }
}

/// Output name derived from a source basename.
pub(crate) fn default_output_name(source: &Path) -> Option<String> {
    let file_name = source.file_name()?.to_str()?;
    let output = match source.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if TYPED_EXTENSIONS.contains(&ext) => {
            let stem = source.file_stem()?.to_str()?;
            format!("{stem}.js")
        }
        _ => file_name.to_string(),
    };
    Some(output)
}

fn has_script_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Expands an [`Entrypoints`] specification into descriptors.
#[derive(Debug)]
pub struct EntrypointResolver<'a> {
    fs: &'a dyn FileSystem,
    cwd: PathBuf,
}

impl<'a> EntrypointResolver<'a> {
    /// Relative entry paths are resolved against `cwd`.
    pub fn new(fs: &'a dyn FileSystem, cwd: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            cwd: cwd.into(),
        }
    }

    /// Resolve every entry, in request order.
    ///
    /// # Errors
    ///
    /// - [`Error::EntryNotFound`] when an explicitly named entry cannot be probed
    /// - [`Error::DuplicateOutput`] when two entries map to one output file
    /// - [`Error::InvalidOutputPath`] for output names leaving the output directory
    /// - [`Error::Config`] when nothing resolves or a directory has a custom name
    pub async fn resolve(&self, entrypoints: &Entrypoints) -> Result<Vec<EntryDescriptor>> {
        let mut descriptors = Vec::new();
        for raw in entrypoints.specs() {
            let spec = parse_entry_spec(raw);
            self.resolve_spec(&spec, &mut descriptors).await?;
        }

        if descriptors.is_empty() {
            return Err(Error::Config(format!(
                "no entrypoints resolved from {:?}",
                entrypoints.specs()
            )));
        }

        check_unique(&descriptors)?;
        Ok(descriptors)
    }

    async fn resolve_spec(&self, spec: &EntrySpec, out: &mut Vec<EntryDescriptor>) -> Result<()> {
        let source = self.absolute(&spec.path);
        let probe = self
            .fs
            .metadata(&source)
            .await
            .map_err(|e| Error::EntryNotFound {
                path: source.clone(),
                reason: e.to_string(),
            })?;

        if probe.is_dir {
            if let Some(name) = &spec.custom_name {
                return Err(Error::Config(format!(
                    "custom name '{}' cannot be applied to directory '{}'",
                    name,
                    source.display()
                )));
            }
            let expanded = self.expand_directory(&source).await?;
            debug!(
                directory = %source.display(),
                count = expanded.len(),
                "expanded entrypoint directory"
            );
            out.extend(expanded);
            return Ok(());
        }

        let output_name = match &spec.custom_name {
            Some(name) => name.clone(),
            None => default_output_name(&source).ok_or_else(|| {
                Error::Config(format!(
                    "cannot derive an output name for '{}'",
                    source.display()
                ))
            })?,
        };
        out.push(EntryDescriptor::new(source, output_name));
        Ok(())
    }

    /// One descriptor per handler directly inside `dir`.
    async fn expand_directory(&self, dir: &Path) -> Result<Vec<EntryDescriptor>> {
        let mut names = self
            .fs
            .read_dir(dir)
            .await
            .map_err(|e| Error::EntryNotFound {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
        names.sort();

        let mut descriptors = Vec::new();
        for name in names.iter().filter(|name| !name.starts_with('.')) {
            let candidate = dir.join(name);
            let Some(probe) = self.probe_candidate(&candidate).await else {
                continue;
            };

            if probe.is_file && has_script_extension(&candidate) {
                if let Some(output_name) = default_output_name(&candidate) {
                    descriptors.push(EntryDescriptor::new(candidate, output_name));
                }
            } else if probe.is_dir {
                if let Some(index) = self.find_index(&candidate).await {
                    descriptors.push(EntryDescriptor::new(index, format!("{name}.js")));
                } else {
                    debug!(candidate = %candidate.display(), "no handler index, skipping");
                }
            }
        }
        Ok(descriptors)
    }

    async fn find_index(&self, dir: &Path) -> Option<PathBuf> {
        for index in INDEX_CANDIDATES {
            let candidate = dir.join(index);
            if let Some(probe) = self.probe_candidate(&candidate).await {
                if probe.is_file {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Probe a directory candidate; failures are skipped, not reported.
    async fn probe_candidate(&self, candidate: &Path) -> Option<Probe> {
        match self.fs.metadata(candidate).await {
            Ok(probe) => Some(probe),
            Err(e) => {
                debug!(candidate = %candidate.display(), error = %e, "skipping unreadable candidate");
                None
            }
        }
    }

    fn absolute(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }
}

fn check_unique(descriptors: &[EntryDescriptor]) -> Result<()> {
    check_output_names(
        descriptors
            .iter()
            .map(|d| (d.output_name.as_str(), d.source_path.as_path())),
    )
}
