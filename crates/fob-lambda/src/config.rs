//! Compilation configuration for a batch of entrypoints.
//!
//! [`ConfigFactory`] assembles one [`CompilationConfig`] covering every
//! resolved entry of a build. The configuration is a plain typed record so a
//! [`ConfigTransformer`](crate::ConfigTransformer) can inspect and rewrite it
//! before it reaches the compiler.
//!
//! # Examples
//!
//! ```
//! use fob_lambda::{BuildMode, ConfigFactory, EntryDescriptor, NodeVersion};
//!
//! let entries = vec![EntryDescriptor::new("/srv/app/handler.js", "handler.js")];
//! let config = ConfigFactory::new("orders")
//!     .output_path("/srv/app/dist")
//!     .mode(BuildMode::Development)
//!     .create(&entries)
//!     .unwrap();
//!
//! assert!(!config.minify);
//! assert_eq!(config.target.node, NodeVersion::lowest());
//! assert!(config.externals.is_empty());
//! ```

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::entry::EntryDescriptor;
use crate::{Error, Result};

/// Runtime versions bundles can be transpiled for.
pub const SUPPORTED_NODE_VERSIONS: [&str; 2] = ["18.20", "20.18"];

/// Build mode.
///
/// Production output is minified; development output is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Production,
    Development,
}

impl BuildMode {
    /// Interpret the mode toggle. Only `development` selects development mode;
    /// any other value, or no value, is production.
    pub fn from_toggle(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("development") => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
        }
    }
}

/// A validated runtime version from [`SUPPORTED_NODE_VERSIONS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeVersion(String);

impl NodeVersion {
    /// Parse a version string, rejecting versions outside the supported set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unsupported versions.
    pub fn parse(version: &str) -> Result<Self> {
        let version = version.trim();
        let version = version.strip_prefix("node").unwrap_or(version);
        if SUPPORTED_NODE_VERSIONS.contains(&version) {
            Ok(Self(version.to_string()))
        } else {
            Err(Error::Config(format!(
                "Unsupported node version '{}'. Expected one of: {}",
                version,
                SUPPORTED_NODE_VERSIONS.join(", ")
            )))
        }
    }

    /// The lowest supported version, used when none is requested.
    pub fn lowest() -> Self {
        Self::supported()
            .min_by_key(|v| v.components())
            .unwrap_or_else(|| Self(SUPPORTED_NODE_VERSIONS[0].to_string()))
    }

    /// Every supported version, in declaration order.
    pub fn supported() -> impl Iterator<Item = NodeVersion> {
        SUPPORTED_NODE_VERSIONS
            .iter()
            .map(|v| NodeVersion((*v).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Target string understood by the compilation engine, e.g. `node18.20`.
    pub fn engine_target(&self) -> String {
        format!("node{}", self.0)
    }

    fn components(&self) -> Vec<u32> {
        self.0
            .split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    }
}

impl Default for NodeVersion {
    fn default() -> Self {
        Self::lowest()
    }
}

impl FromStr for NodeVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<NodeVersion> for String {
    fn from(version: NodeVersion) -> Self {
        version.0
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Modules left as runtime references instead of being inlined.
///
/// Keys are module specifiers as written in `require`/`import`, values are the
/// reference emitted in the bundle. Insertion order is preserved.
///
/// Merge semantics: inserting an existing module replaces its reference but
/// keeps its position; [`Externals::merge`] applies the other mapping's entries
/// in order, so the other mapping wins on conflicts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Externals(IndexMap<String, String>);

impl Externals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `module` to `reference`, returning the previous reference.
    pub fn insert(
        &mut self,
        module: impl Into<String>,
        reference: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(module.into(), reference.into())
    }

    /// Leave `module` external under its own name.
    pub fn externalize(&mut self, module: impl Into<String>) -> Option<String> {
        let module = module.into();
        let reference = module.clone();
        self.0.insert(module, reference)
    }

    /// Remove a module, preserving the order of the remaining entries.
    pub fn remove(&mut self, module: &str) -> Option<String> {
        self.0.shift_remove(module)
    }

    /// Apply `other` on top of `self`.
    pub fn merge(&mut self, other: Externals) {
        for (module, reference) in other.0 {
            self.0.insert(module, reference);
        }
    }

    pub fn get(&self, module: &str) -> Option<&str> {
        self.0.get(module).map(String::as_str)
    }

    pub fn contains(&self, module: &str) -> bool {
        self.0.contains_key(module)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Module names in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Externals {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut externals = Externals::new();
        for (module, reference) in iter {
            externals.insert(module, reference);
        }
        externals
    }
}

/// How sources matching a [`ModuleRule`] are compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    /// Conventional JavaScript.
    Script,
    /// TypeScript, with types stripped.
    TypeScript,
}

/// Source handling rule selected by file extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRule {
    /// Extensions with a leading dot, e.g. `.ts`.
    pub extensions: Vec<String>,
    pub loader: Loader,
    /// Emit a `.map` sibling for bundles whose entry matches this rule.
    pub source_map: bool,
}

impl ModuleRule {
    pub fn script() -> Self {
        Self {
            extensions: vec![".js".into(), ".mjs".into(), ".cjs".into()],
            loader: Loader::Script,
            source_map: false,
        }
    }

    pub fn typescript() -> Self {
        Self {
            extensions: vec![".ts".into(), ".mts".into(), ".cts".into()],
            loader: Loader::TypeScript,
            source_map: true,
        }
    }

    /// Whether `path` has one of this rule's extensions.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|candidate| candidate.trim_start_matches('.') == ext)
            })
            .unwrap_or(false)
    }
}

/// Transpilation rule: the minimum runtime the output must run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspileTarget {
    pub node: NodeVersion,
}

/// Configuration handed to the compiler, covering every entry of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationConfig {
    /// Logical grouping label, passed through untouched.
    pub service_name: String,
    /// Base directory for module resolution.
    pub context: PathBuf,
    /// Absolute directory bundles are written to.
    pub output_path: PathBuf,
    /// Output name (relative to `output_path`) to absolute source path.
    pub entries: IndexMap<String, PathBuf>,
    pub externals: Externals,
    pub mode: BuildMode,
    pub minify: bool,
    pub target: TranspileTarget,
    pub rules: Vec<ModuleRule>,
    /// Extensions tried, in order, when resolving extensionless imports.
    pub resolve_extensions: Vec<String>,
}

impl CompilationConfig {
    /// The first rule matching `source`.
    pub fn rule_for(&self, source: &Path) -> Option<&ModuleRule> {
        self.rules.iter().find(|rule| rule.matches(source))
    }

    /// Whether the bundle built from `source` gets a source map sibling.
    pub fn wants_source_map(&self, source: &Path) -> bool {
        self.rule_for(source).is_some_and(|rule| rule.source_map)
    }

    /// Whether any entry of the batch needs a source map.
    pub fn needs_source_maps(&self) -> bool {
        self.entries
            .values()
            .any(|source| self.wants_source_map(source))
    }

    /// Check the invariants the compiler relies on.
    ///
    /// Run again after a transformer, since it may have rewritten entries.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when there are no entries, when an output
    /// name is absolute or escapes `output_path`, or when two output names
    /// point at the same file.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::Config("no entrypoints to compile".to_string()));
        }
        if !self.output_path.is_absolute() {
            return Err(Error::InvalidOutputPath(format!(
                "output directory '{}' must be absolute",
                self.output_path.display()
            )));
        }

        check_output_names(
            self.entries
                .iter()
                .map(|(name, source)| (name.as_str(), source.as_path())),
        )
    }
}

/// Name the compilation engine sees for an entry: the output name without `.js`.
pub(crate) fn engine_name(output_name: &str) -> String {
    output_name
        .strip_suffix(".js")
        .unwrap_or(output_name)
        .to_string()
}

/// Reject output names that leave the output directory or that collide.
///
/// Two names collide when they clean to the same path, or when they map to
/// the same engine name (`x.js` and `x`), since the engine would then emit a
/// single chunk for both.
pub(crate) fn check_output_names<'a>(
    names: impl IntoIterator<Item = (&'a str, &'a Path)>,
) -> Result<()> {
    let mut seen: IndexMap<String, &Path> = IndexMap::new();
    for (name, source) in names {
        let normalized = normalize_output_name(name)?;
        let key = engine_name(&normalized.to_string_lossy().replace('\\', "/"));
        if let Some(first) = seen.insert(key, source) {
            return Err(Error::DuplicateOutput {
                name: name.to_string(),
                first: first.to_path_buf(),
                second: source.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Clean a relative output name and reject anything leaving the output directory.
pub(crate) fn normalize_output_name(name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidOutputPath(format!("'{}'", name)));
    }

    let cleaned = Path::new(name).clean();
    let escapes = cleaned.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || cleaned.as_os_str().is_empty() || cleaned == Path::new(".") {
        return Err(Error::InvalidOutputPath(name.to_string()));
    }
    Ok(cleaned)
}

/// Assembles the [`CompilationConfig`] for one build.
#[derive(Debug, Clone)]
pub struct ConfigFactory {
    service_name: String,
    context: Option<PathBuf>,
    output_path: Option<PathBuf>,
    node_version: NodeVersion,
    mode: BuildMode,
}

impl ConfigFactory {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            context: None,
            output_path: None,
            node_version: NodeVersion::lowest(),
            mode: BuildMode::Production,
        }
    }

    /// Resolution base directory (default: the output directory).
    pub fn context(mut self, context: impl Into<PathBuf>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Absolute output directory.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn node_version(mut self, version: NodeVersion) -> Self {
        self.node_version = version;
        self
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build the configuration for `entries`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no output directory was set or the
    /// assembled configuration fails [`CompilationConfig::validate`].
    pub fn create(&self, entries: &[EntryDescriptor]) -> Result<CompilationConfig> {
        let output_path = self
            .output_path
            .clone()
            .ok_or_else(|| Error::Config("output directory is not set".to_string()))?
            .clean();
        let context = self
            .context
            .clone()
            .unwrap_or_else(|| output_path.clone());

        let entries = entries
            .iter()
            .map(|entry| (entry.output_name.clone(), entry.source_path.clone()))
            .collect();

        let config = CompilationConfig {
            service_name: self.service_name.clone(),
            context,
            output_path,
            entries,
            externals: Externals::new(),
            mode: self.mode,
            minify: !self.mode.is_development(),
            target: TranspileTarget {
                node: self.node_version.clone(),
            },
            rules: vec![ModuleRule::script(), ModuleRule::typescript()],
            resolve_extensions: [".js", ".mjs", ".cjs", ".ts", ".mts", ".cts", ".json"]
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }
}
