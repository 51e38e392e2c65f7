//! Hosted media CDN backend.
//!
//! Uploads go to a multipart endpoint; existence checks and downloads hit
//! the public delivery URL; deletion looks the file up by path through the
//! management API and deletes it by id. The private key is sent as the
//! basic-auth user name with an empty password.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{MediaStorage, StorageError, available_name, clean_name};
use crate::config::CdnConfig;

#[derive(Debug, Deserialize)]
struct CdnFile {
    #[serde(rename = "fileId")]
    file_id: String,
}

/// Media CDN client.
#[derive(Clone)]
pub struct CdnStorage {
    client: reqwest::Client,
    upload_url: url::Url,
    api_url: url::Url,
    url_endpoint: String,
    private_key: SecretString,
    folder: String,
}

impl CdnStorage {
    /// Create a CDN client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CdnConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            api_url: config.api_url.clone(),
            url_endpoint: config.url_endpoint.as_str().trim_end_matches('/').to_string(),
            private_key: config.private_key.clone(),
            folder: config.folder.clone(),
        })
    }

    /// `/{folder}/{name}` as the CDN addresses it.
    fn remote_path(&self, name: &str) -> String {
        if self.folder.is_empty() {
            format!("/{name}")
        } else {
            format!("/{}/{name}", self.folder)
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url.as_str().trim_end_matches('/'))
    }

    async fn error_from(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        StorageError::Api {
            status,
            message: message.chars().take(200).collect(),
        }
    }
}

impl std::fmt::Debug for CdnStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnStorage")
            .field("upload_url", &self.upload_url.as_str())
            .field("url_endpoint", &self.url_endpoint)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MediaStorage for CdnStorage {
    fn backend(&self) -> &'static str {
        "cdn"
    }

    async fn save(&self, name: &str, content: Bytes) -> Result<String, StorageError> {
        let name = available_name(self, name).await?;
        let (dir, file_name) = name.rsplit_once('/').map_or(("", name.as_str()), |(d, f)| (d, f));
        let folder = self.remote_path(dir);

        let form = Form::new()
            .part("file", Part::bytes(content.to_vec()).file_name(file_name.to_string()))
            .text("fileName", file_name.to_string())
            .text("folder", folder.trim_end_matches('/').to_string())
            .text("useUniqueFileName", "false");

        let response = self
            .client
            .post(self.upload_url.clone())
            .basic_auth(self.private_key.expose_secret(), Some(""))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        tracing::debug!(name = %name, bytes = content.len(), "Uploaded media file");
        Ok(name)
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let name = clean_name(name)?;
        let response = self.client.head(self.url(&name)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::error_from(response).await),
        }
    }

    fn url(&self, name: &str) -> String {
        format!("{}{}", self.url_endpoint, self.remote_path(name.trim_start_matches('/')))
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let name = clean_name(name)?;
        let (dir, file_name) = name.rsplit_once('/').map_or(("", name.as_str()), |(d, f)| (d, f));
        let response = self
            .client
            .get(self.api("files"))
            .basic_auth(self.private_key.expose_secret(), Some(""))
            .query(&[("path", self.remote_path(dir).as_str()), ("name", file_name)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let files: Vec<CdnFile> = response.json().await?;
        let Some(file) = files.into_iter().next() else {
            return Ok(false);
        };

        let response = self
            .client
            .delete(self.api(&format!("files/{}", file.file_id)))
            .basic_auth(self.private_key.expose_secret(), Some(""))
            .send()
            .await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn open(&self, name: &str) -> Result<Bytes, StorageError> {
        let name = clean_name(name)?;
        let response = self.client.get(self.url(&name)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(response.bytes().await?),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(name)),
            _ => Err(Self::error_from(response).await),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn storage(folder: &str) -> CdnStorage {
        CdnStorage::new(&CdnConfig {
            upload_url: url::Url::parse("https://upload.cdn.test/api/v1/files/upload").unwrap(),
            api_url: url::Url::parse("https://api.cdn.test/v1/").unwrap(),
            url_endpoint: url::Url::parse("https://media.cdn.test/shop/").unwrap(),
            private_key: SecretString::from("private_key_value"),
            folder: folder.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_urls_include_folder() {
        let storage = storage("emporium");
        assert_eq!(
            storage.url("products/3/a.jpg"),
            "https://media.cdn.test/shop/emporium/products/3/a.jpg"
        );
        assert_eq!(storage.api("files"), "https://api.cdn.test/v1/files");
    }

    #[test]
    fn test_empty_folder() {
        let storage = storage("");
        assert_eq!(storage.url("a.jpg"), "https://media.cdn.test/shop/a.jpg");
        assert_eq!(storage.remote_path(""), "/");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", storage("emporium"));
        assert!(!debug.contains("private_key_value"));
    }
}
