//! Media storage for product images.
//!
//! # Backends
//!
//! - [`LocalStorage`] - files under a directory, served by the API itself
//! - [`CdnStorage`] - a hosted media CDN with an upload endpoint and a
//!   management API
//!
//! Stored names are relative paths such as `products/12/shirt.jpg`.

mod cdn;
mod local;

pub use cdn::CdnStorage;
pub use local::LocalStorage;

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use rand::distr::Alphanumeric;
use thiserror::Error;

use crate::config::StorageConfig;

/// Attempts at finding a free name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The name is empty or escapes the storage root.
    #[error("invalid file name: {0}")]
    InvalidName(String),

    /// No free variant of the requested name was found.
    #[error("no available name for {0}")]
    NameExhausted(String),

    /// The file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request to the CDN failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CDN answered with an error.
    #[error("CDN error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Object storage for media files.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn backend(&self) -> &'static str;

    /// Store `content` under `name`, or under a free variant of it when the
    /// name is taken. Returns the name actually used.
    async fn save(&self, name: &str, content: Bytes) -> Result<String, StorageError>;

    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Public absolute URL of a stored file.
    fn url(&self, name: &str) -> String;

    /// Remove a file. Returns `false` when it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    async fn open(&self, name: &str) -> Result<Bytes, StorageError>;
}

/// Build the backend named by configuration.
///
/// # Errors
///
/// Returns error if the CDN HTTP client fails to build.
pub fn from_config(config: &StorageConfig) -> Result<Box<dyn MediaStorage>, StorageError> {
    Ok(match config {
        StorageConfig::Local { root, base_url } => {
            Box::new(LocalStorage::new(root.clone(), base_url.clone()))
        }
        StorageConfig::Cdn(cdn) => Box::new(CdnStorage::new(cdn)?),
    })
}

/// Normalize a relative storage name.
///
/// # Errors
///
/// Returns `StorageError::InvalidName` for empty names, absolute paths,
/// backslashes, and `.` or `..` segments.
pub fn clean_name(name: &str) -> Result<String, StorageError> {
    let trimmed = name.trim().trim_start_matches('/');
    let invalid = || StorageError::InvalidName(name.to_string());
    if trimmed.is_empty() || trimmed.contains('\\') || trimmed.contains('\0') {
        return Err(invalid());
    }
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || segments.iter().any(|s| matches!(*s, "." | "..")) {
        return Err(invalid());
    }
    Ok(segments.join("/"))
}

/// `dir/stem_abc1234.ext` for `dir/stem.ext`.
fn with_random_suffix(name: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    let (dir, file) = name.rsplit_once('/').map_or(("", name), |(d, f)| (d, f));
    let renamed = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{file}_{suffix}"),
    };
    if dir.is_empty() {
        renamed
    } else {
        format!("{dir}/{renamed}")
    }
}

/// The first name not already taken in `storage`, starting with `name`.
///
/// # Errors
///
/// Returns `StorageError::NameExhausted` if every attempt collides.
pub async fn available_name(storage: &dyn MediaStorage, name: &str) -> Result<String, StorageError> {
    let name = clean_name(name)?;
    if !storage.exists(&name).await? {
        return Ok(name);
    }
    for _ in 0..MAX_NAME_ATTEMPTS {
        let candidate = with_random_suffix(&name);
        if !storage.exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(StorageError::NameExhausted(name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("/products//1/a.jpg").unwrap(), "products/1/a.jpg");
        assert!(clean_name("../etc/passwd").is_err());
        assert!(clean_name("a/./b").is_err());
        assert!(clean_name("a\\b").is_err());
        assert!(clean_name("  ").is_err());
    }

    #[test]
    fn test_random_suffix_keeps_dir_and_extension() {
        let renamed = with_random_suffix("products/1/shirt.jpg");
        assert!(renamed.starts_with("products/1/shirt_"));
        assert!(renamed.ends_with(".jpg"));
        assert_eq!(renamed.len(), "products/1/shirt_.jpg".len() + 7);

        let bare = with_random_suffix("README");
        assert!(bare.starts_with("README_"));
    }
}
