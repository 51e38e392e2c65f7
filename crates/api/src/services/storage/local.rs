//! Filesystem storage for development and tests.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use super::{MediaStorage, StorageError, available_name, clean_name};

/// Stores files under `root`; URLs are `{base_url}/{name}`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    #[must_use]
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Directory files are stored under.
    #[must_use]
    pub const fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(clean_name(name)?))
    }
}

#[async_trait]
impl MediaStorage for LocalStorage {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn save(&self, name: &str, content: Bytes) -> Result<String, StorageError> {
        let name = available_name(self, name).await?;
        let path = self.path(&name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &content).await?;
        tracing::debug!(name = %name, bytes = content.len(), "Stored media file");
        Ok(name)
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.path(name)?).await?)
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(self.path(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, name: &str) -> Result<Bytes, StorageError> {
        match tokio::fs::read(self.path(name)?).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path().to_path_buf(), "http://localhost:8000/media/".to_string())
    }

    #[tokio::test]
    async fn test_save_open_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let name = storage
            .save("products/1/shirt.jpg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();
        assert_eq!(name, "products/1/shirt.jpg");
        assert!(storage.exists(&name).await.unwrap());
        assert_eq!(storage.open(&name).await.unwrap(), Bytes::from_static(b"jpeg"));
        assert_eq!(
            storage.url(&name),
            "http://localhost:8000/media/products/1/shirt.jpg"
        );

        assert!(storage.delete(&name).await.unwrap());
        assert!(!storage.delete(&name).await.unwrap());
        assert!(matches!(
            storage.open(&name).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_taken_name_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let first = storage.save("a.png", Bytes::from_static(b"1")).await.unwrap();
        let second = storage.save("a.png", Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(first, "a.png");
        assert_ne!(second, first);
        assert!(second.starts_with("a_") && second.ends_with(".png"));
        assert_eq!(storage.open(&first).await.unwrap(), Bytes::from_static(b"1"));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        assert!(matches!(
            storage.save("../escape.txt", Bytes::new()).await,
            Err(StorageError::InvalidName(_))
        ));
    }
}
