//! File storage behind a provider-neutral trait.
//!
//! Only the local filesystem backend is functional. The cloud providers are
//! wired through configuration but answer every call with `NotImplemented`.

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub mod local;
pub mod cloud;

pub use cloud::CloudStorage;
pub use local::LocalFileStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0} storage is not implemented")]
    NotImplemented(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Local,
    S3,
    Gcs,
    Azure,
}

impl StorageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::Local => "local",
            StorageProvider::S3 => "s3",
            StorageProvider::Gcs => "gcs",
            StorageProvider::Azure => "azure",
        }
    }
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StorageProvider {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageProvider::Local),
            "s3" => Ok(StorageProvider::S3),
            "gcs" => Ok(StorageProvider::Gcs),
            "azure" => Ok(StorageProvider::Azure),
            other => Err(StorageError::InvalidKey(format!("unknown storage provider: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    fn provider(&self) -> StorageProvider;
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<StoredFile, StorageError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
    fn public_url(&self, key: &str) -> String;
}

/// Keys are relative, slash separated and never escape the storage root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.len() > 512
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad { Err(StorageError::InvalidKey(key.to_string())) } else { Ok(()) }
}

/// Build the configured backend.
pub fn from_config(cfg: &configs::StorageConfig) -> Result<Arc<dyn FileStorage>, StorageError> {
    let provider: StorageProvider = cfg.provider.parse()?;
    info!(%provider, "storage_backend");
    Ok(match provider {
        StorageProvider::Local => Arc::new(LocalFileStorage::new(&cfg.local_root, &cfg.public_base_url)),
        cloud => Arc::new(CloudStorage::new(cloud)),
    })
}

const AVATAR_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Upload policy on top of a [`FileStorage`] backend.
pub struct StorageService {
    backend: Arc<dyn FileStorage>,
    max_upload_bytes: usize,
}

impl StorageService {
    pub fn new(backend: Arc<dyn FileStorage>, max_upload_bytes: usize) -> Self { Self { backend, max_upload_bytes } }

    pub fn backend(&self) -> &dyn FileStorage { self.backend.as_ref() }

    pub async fn store_avatar(&self, user_id: Uuid, bytes: &[u8], content_type: &str) -> Result<StoredFile, crate::ServiceError> {
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        let ext = AVATAR_TYPES
            .iter()
            .find(|(m, _)| *m == mime)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| crate::ServiceError::Validation(format!("unsupported avatar type: {mime}")))?;
        if bytes.is_empty() {
            return Err(crate::ServiceError::Validation("avatar file is empty".into()));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(crate::ServiceError::Validation(format!("avatar exceeds {} bytes", self.max_upload_bytes)));
        }
        let key = format!("avatars/{}/{}.{}", user_id, Uuid::new_v4(), ext);
        Ok(self.backend.put(&key, bytes, &mime).await?)
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> { self.backend.get(key).await }

    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> { self.backend.delete(key).await }

    /// Reverse of `public_url` for keys this backend issued.
    pub fn key_for_url(&self, url: &str) -> Option<String> {
        let base = self.backend.public_url("");
        url.strip_prefix(&base).filter(|k| validate_key(k).is_ok()).map(str::to_string)
    }
}

/// Guess a content type from the key extension, for serving local files.
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    AVATAR_TYPES
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(m, _)| *m)
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        for ok in ["avatars/u/a.png", "a", "x/y/z.txt"] {
            assert!(validate_key(ok).is_ok(), "{ok}");
        }
        for bad in ["", "/abs", "../up", "a/../b", "a//b", "a\\b", "a/./b", "trailing/"] {
            assert!(validate_key(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn provider_parsing_and_content_types() {
        assert_eq!("S3".parse::<StorageProvider>().unwrap(), StorageProvider::S3);
        assert!("ftp".parse::<StorageProvider>().is_err());
        assert_eq!(content_type_for("avatars/u/x.JPG"), "image/jpeg");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
    }

    #[test]
    fn cloud_providers_build_from_config() {
        let cfg = configs::StorageConfig { provider: "gcs".into(), ..configs::StorageConfig::default() };
        let backend = from_config(&cfg).unwrap();
        assert_eq!(backend.provider(), StorageProvider::Gcs);
    }
}
