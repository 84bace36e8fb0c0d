//! Shared test utilities for fob-lambda tests

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fob_lambda::fs::{FileSystem, FsError, FsResult, NativeFs, Probe};
use fob_lambda::{CompilationConfig, Compiler, CompilerOutput, LambdaBundler, Settings};

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get the path to a specific fixture file as an entry string
pub fn fixture(relative: &str) -> String {
    fixtures_dir().join(relative).to_string_lossy().into_owned()
}

/// Bundler with default settings, independent of the test environment.
pub fn bundler() -> LambdaBundler {
    LambdaBundler::new().with_settings(Settings::default())
}

/// Names of the members of a zip archive, sorted.
pub fn zip_members(path: &Path) -> Vec<String> {
    let file = File::open(path).unwrap_or_else(|e| panic!("open {}: {}", path.display(), e));
    let archive = zip::ZipArchive::new(file).expect("valid zip archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Recursively copy a fixture directory into `dest`.
pub fn copy_dir(src: &Path, dest: &Path) {
    std::fs::create_dir_all(dest).unwrap();
    for entry in std::fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let target = dest.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// Native filesystem that fails probes of chosen paths and records every
/// probe it receives.
#[derive(Debug, Default)]
pub struct FlakyFs {
    failing: Vec<PathBuf>,
    cwd: Option<PathBuf>,
    probed: Mutex<Vec<PathBuf>>,
}

impl FlakyFs {
    pub fn failing(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            failing: paths.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn probed(&self) -> Vec<PathBuf> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileSystem for FlakyFs {
    async fn metadata(&self, path: &Path) -> FsResult<Probe> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        if self.failing.iter().any(|p| p == path) {
            return Err(FsError::Io("Simulated unreadable".to_string()));
        }
        NativeFs.metadata(path).await
    }

    async fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        NativeFs.read_dir(path).await
    }

    fn current_dir(&self) -> FsResult<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => NativeFs.current_dir(),
        }
    }
}

/// Compiler that records the configurations it receives and emits nothing.
#[derive(Debug, Default)]
pub struct RecordingCompiler {
    calls: AtomicUsize,
    configs: Mutex<Vec<CompilationConfig>>,
    output: Mutex<Option<CompilerOutput>>,
}

impl RecordingCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Return `output` from every call.
    pub fn returning(output: CompilerOutput) -> Arc<Self> {
        let compiler = Self::default();
        *compiler.output.lock().unwrap() = Some(output);
        Arc::new(compiler)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<CompilationConfig> {
        self.configs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Compiler for RecordingCompiler {
    async fn compile(&self, config: &CompilationConfig) -> fob_lambda::Result<CompilerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config.clone());
        Ok(self.output.lock().unwrap().clone().unwrap_or_default())
    }
}
