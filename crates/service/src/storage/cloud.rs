use async_trait::async_trait;

use super::{validate_key, FileStorage, StorageError, StorageProvider, StoredFile};

/// Placeholder for S3, GCS and Azure Blob backends. Keys are still validated
/// so callers see the same errors they would from a real provider.
pub struct CloudStorage {
    provider: StorageProvider,
}

impl CloudStorage {
    pub fn new(provider: StorageProvider) -> Self { Self { provider } }

    fn unsupported<T>(&self, key: &str) -> Result<T, StorageError> {
        validate_key(key)?;
        Err(StorageError::NotImplemented(self.provider.as_str()))
    }
}

#[async_trait]
impl FileStorage for CloudStorage {
    fn provider(&self) -> StorageProvider { self.provider }

    async fn put(&self, key: &str, _bytes: &[u8], _content_type: &str) -> Result<StoredFile, StorageError> { self.unsupported(key) }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> { self.unsupported(key) }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> { self.unsupported(key) }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> { self.unsupported(key) }

    fn public_url(&self, key: &str) -> String { format!("{}://{}", self.provider, key) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_reports_not_implemented() {
        for provider in [StorageProvider::S3, StorageProvider::Gcs, StorageProvider::Azure] {
            let s = CloudStorage::new(provider);
            assert!(matches!(s.put("a/b.png", b"x", "image/png").await, Err(StorageError::NotImplemented(_))));
            assert!(matches!(s.get("a/b.png").await, Err(StorageError::NotImplemented(_))));
            assert!(matches!(s.delete("a/b.png").await, Err(StorageError::NotImplemented(_))));
            assert!(matches!(s.exists("../b").await, Err(StorageError::InvalidKey(_))));
        }
    }
}
