//! Deployment archives.
//!
//! Each bundle gets a `<bundle>.zip` sibling holding the bundle, its source
//! map and the shared chunks it loads, stored at their paths relative to the
//! output directory.

use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::compiler::EmittedBundle;
use crate::compiler::writer::temp_path_for;
use crate::{Error, Result};

/// Path of the archive created for a bundle at `bundle_path`.
pub fn archive_path(bundle_path: &Path) -> PathBuf {
    let mut name = bundle_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".zip");
    bundle_path.with_file_name(name)
}

/// Archive every bundle, one zip per bundle.
///
/// Returns the archive paths in bundle order. The first failure aborts.
pub async fn archive_bundles(output_dir: &Path, bundles: &[EmittedBundle]) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::with_capacity(bundles.len());
    for bundle in bundles {
        let dir = output_dir.to_path_buf();
        let owned = bundle.clone();
        let target = archive_path(&bundle.path);

        let created = tokio::task::spawn_blocking(move || write_archive(&dir, &owned))
            .await
            .map_err(|e| Error::Archive {
                path: target,
                reason: format!("archive task failed: {}", e),
            })??;

        debug!(archive = %created.display(), "archive written");
        archives.push(created);
    }
    Ok(archives)
}

/// Name of `path` inside an archive: relative to the output directory, with
/// forward slashes.
fn entry_name(output_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(output_dir).unwrap_or_else(|_| {
        path.file_name()
            .map(Path::new)
            .unwrap_or(path)
    });
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Read every member, write the zip to a temporary sibling and rename it into
/// place. A failure leaves neither the archive nor the temporary behind.
fn write_archive(output_dir: &Path, bundle: &EmittedBundle) -> Result<PathBuf> {
    let target = archive_path(&bundle.path);
    let fail = |reason: String| Error::Archive {
        path: target.clone(),
        reason,
    };

    let mut members = vec![bundle.path.clone()];
    members.extend(bundle.source_map.iter().cloned());
    members.extend(bundle.companions.iter().cloned());

    let mut contents = Vec::with_capacity(members.len());
    for member in &members {
        let bytes = std::fs::read(member)
            .map_err(|e| fail(format!("cannot read {}: {}", member.display(), e)))?;
        contents.push((entry_name(output_dir, member), bytes));
    }

    let temp = temp_path_for(&target);
    let committed = write_zip(&temp, &contents)
        .and_then(|()| std::fs::rename(&temp, &target).map_err(|e| e.to_string()));
    if let Err(reason) = committed {
        if temp.exists() {
            let _ = std::fs::remove_file(&temp);
        }
        return Err(fail(reason));
    }
    Ok(target)
}

fn write_zip(path: &Path, members: &[(String, Vec<u8>)]) -> std::result::Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in members {
        zip.start_file(name.as_str(), options)
            .map_err(|e| e.to_string())?;
        zip.write_all(bytes).map_err(|e| e.to_string())?;
    }
    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}
