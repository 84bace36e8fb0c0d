//! Filesystem probing abstraction.
//!
//! Entrypoint resolution only needs three operations: probe a path, list a
//! directory and know the working directory. They sit behind [`FileSystem`] so
//! the resolver can be driven against a simulated filesystem in tests (for
//! example one where a single candidate is unreadable).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for filesystem operations
pub type FsResult<T> = Result<T, FsError>;

/// Errors returned by [`FileSystem`] implementations
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other error
    #[error("Filesystem error: {0}")]
    Other(String),
}

/// What a successful probe learned about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Whether this is a directory
    pub is_dir: bool,
    /// Whether this is a regular file
    pub is_file: bool,
    /// File size in bytes
    pub size: u64,
}

/// Async filesystem operations used by the entrypoint resolver.
#[async_trait]
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Stat-like probe. Fails when the path is missing or unreadable.
    async fn metadata(&self, path: &Path) -> FsResult<Probe>;

    /// Names of the direct children of a directory, in any order.
    async fn read_dir(&self, path: &Path) -> FsResult<Vec<String>>;

    /// The process working directory.
    fn current_dir(&self) -> FsResult<PathBuf>;
}

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

impl NativeFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for NativeFs {
    async fn metadata(&self, path: &Path) -> FsResult<Probe> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FsError::NotFound(path.to_path_buf())
            } else {
                FsError::Io(format!(
                    "Failed to get metadata for {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        Ok(Probe {
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
            size: metadata.len(),
        })
    }

    async fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FsError::Io(format!("Failed to read {}: {}", path.display(), e)))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn current_dir(&self) -> FsResult<PathBuf> {
        std::env::current_dir()
            .map_err(|e| FsError::Other(format!("Failed to get current directory: {}", e)))
    }
}
