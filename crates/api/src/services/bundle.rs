//! Admin bundle installation.
//!
//! The admin UI ships as a zip archive. It is extracted into a staging
//! directory next to the served one and swapped in with renames, so requests
//! never see a half-written bundle.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

/// Largest total uncompressed size accepted.
pub const MAX_BUNDLE_BYTES: u64 = 200 * 1024 * 1024;

/// Errors that can occur while installing a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The upload is not a readable zip archive.
    #[error("invalid archive: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),

    /// An entry would be written outside the bundle directory.
    #[error("unsafe path in archive: {0}")]
    UnsafePath(String),

    /// The archive holds no files.
    #[error("archive is empty")]
    Empty,

    /// The archive expands past [`MAX_BUNDLE_BYTES`].
    #[error("archive expands to more than {MAX_BUNDLE_BYTES} bytes")]
    TooLarge,

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking extraction task failed.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// What an install wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BundleSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Replace the bundle served from `target` with the contents of `archive`.
///
/// # Errors
///
/// Returns `BundleError` if the archive is invalid or unsafe, or if the
/// filesystem swap fails. The served bundle is untouched on error.
pub async fn install(target: PathBuf, archive: Bytes) -> Result<BundleSummary, BundleError> {
    tokio::task::spawn_blocking(move || install_blocking(&target, &archive))
        .await
        .map_err(|e| BundleError::Task(e.to_string()))?
}

fn sibling(target: &Path, tag: &str) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "bundle".into(), |n| n.to_string_lossy().into_owned());
    target.with_file_name(format!(".{name}.{tag}-{}", Uuid::new_v4().simple()))
}

fn install_blocking(target: &Path, archive: &[u8]) -> Result<BundleSummary, BundleError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let staging = sibling(target, "staging");
    let summary = match extract(archive, &staging) {
        Ok(summary) => summary,
        Err(e) => {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    let previous = sibling(target, "old");
    let had_previous = target.exists();
    if had_previous {
        std::fs::rename(target, &previous)?;
    }
    if let Err(e) = std::fs::rename(&staging, target) {
        if had_previous {
            let _ = std::fs::rename(&previous, target);
        }
        let _ = std::fs::remove_dir_all(&staging);
        return Err(e.into());
    }
    if had_previous && let Err(e) = std::fs::remove_dir_all(&previous) {
        tracing::warn!(error = %e, path = %previous.display(), "Could not remove previous bundle");
    }

    tracing::info!(files = summary.files, bytes = summary.bytes, "Admin bundle installed");
    Ok(summary)
}

fn extract(archive: &[u8], dest: &Path) -> Result<BundleSummary, BundleError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    std::fs::create_dir_all(dest)?;

    let mut summary = BundleSummary { files: 0, bytes: 0 };
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| BundleError::UnsafePath(entry.name().to_string()))?;
        let path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&path)?;
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let remaining = MAX_BUNDLE_BYTES - summary.bytes;
        let mut content = Vec::new();
        let read = (&mut entry).take(remaining + 1).read_to_end(&mut content)?;
        let read = read as u64;
        if read > remaining {
            return Err(BundleError::TooLarge);
        }
        std::fs::write(&path, &content)?;
        summary.files += 1;
        summary.bytes += read;
    }

    if summary.files == 0 {
        return Err(BundleError::Empty);
    }
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn archive(entries: &[(&str, &str)]) -> Bytes {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            for (name, content) in entries {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        Bytes::from(buffer.into_inner())
    }

    #[tokio::test]
    async fn test_install_replaces_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("admin");

        install(target.clone(), archive(&[("index.html", "v1"), ("old.js", "x")]))
            .await
            .unwrap();
        let summary = install(
            target.clone(),
            archive(&[("index.html", "v2"), ("assets/app.js", "js")]),
        )
        .await
        .unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(std::fs::read_to_string(target.join("index.html")).unwrap(), "v2");
        assert!(target.join("assets/app.js").exists());
        assert!(!target.join("old.js").exists());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != "admin")
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_traversal_keeps_current_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("admin");
        install(target.clone(), archive(&[("index.html", "v1")]))
            .await
            .unwrap();

        let result = install(target.clone(), archive(&[("../evil.html", "x")])).await;
        assert!(matches!(result, Err(BundleError::UnsafePath(_))));
        assert_eq!(std::fs::read_to_string(target.join("index.html")).unwrap(), "v1");
        assert!(!dir.path().join("evil.html").exists());
    }

    #[tokio::test]
    async fn test_rejects_garbage_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("admin");
        assert!(matches!(
            install(target.clone(), Bytes::from_static(b"not a zip")).await,
            Err(BundleError::InvalidArchive(_))
        ));
        assert!(matches!(
            install(target, archive(&[])).await,
            Err(BundleError::Empty)
        ));
    }
}
