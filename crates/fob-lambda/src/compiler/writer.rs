//! Atomic writing of compiled output.
//!
//! Every emitted file is validated to stay inside the output directory, written
//! to a temporary sibling first and renamed into place once all writes
//! succeeded. If any write fails, the temporaries written so far are removed.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::{Error, Result};

/// Collects files for one output directory and writes them in one go.
#[derive(Debug)]
pub struct OutputWriter {
    dir: PathBuf,
    pending: Vec<(PathBuf, Vec<u8>)>,
}

impl OutputWriter {
    /// Create a writer rooted at `dir`, which must be absolute.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().clean();
        if !dir.is_absolute() {
            return Err(Error::InvalidOutputPath(format!(
                "output directory '{}' must be absolute",
                dir.display()
            )));
        }
        Ok(Self {
            dir,
            pending: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queue `contents` for `filename` (relative to the output directory).
    ///
    /// Returns the absolute target path.
    pub fn add(&mut self, filename: &str, contents: impl Into<Vec<u8>>) -> Result<PathBuf> {
        let target = validate_output_path(&self.dir, filename)?;
        if let Some(slot) = self.pending.iter_mut().find(|(path, _)| *path == target) {
            slot.1 = contents.into();
        } else {
            self.pending.push((target.clone(), contents.into()));
        }
        Ok(target)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Write every queued file. Blocking; call from a blocking context.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Write(format!(
                "Failed to create output directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;
        write_files_atomic(&self.pending)?;
        Ok(self.pending.into_iter().map(|(path, _)| path).collect())
    }
}

/// Resolve `filename` under `base_dir`, rejecting anything that escapes it.
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

/// Temporary sibling of `target`: the full file name plus `.tmp`.
///
/// The suffix is appended, not swapped for the extension, because one commit
/// may hold `a.js`, `a.mjs` and `a.js.map`, which must not share a temporary.
pub(crate) fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn write_files_atomic(operations: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::Write(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::Write(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::Write(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best-effort removal of temporaries; we are already failing.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %e,
                    "failed to clean up temporary file"
                );
            }
        }
    }
}
