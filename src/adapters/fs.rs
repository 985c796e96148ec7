//! Filesystem storage adapter for single-host deployments and tests.

use crate::ports::storage::StoragePort;
use async_trait::async_trait;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StoragePort for FsStorage {
    async fn upload_file(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(key.to_string())
    }

    async fn get_file(&self, key: &str) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        Ok(tokio::fs::read(self.root.join(key)).await?)
    }

    async fn presign(
        &self,
        key: &str,
        _expiry: Duration,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        // No signing for local files; hand back a file URL.
        Ok(format!("file://{}", self.root.join(key).display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn stores_and_reads_back_under_nested_keys() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        let key = "uploads/vid-1/original/clip.mp4";
        let reference = storage
            .upload_file(key, b"movie bytes".to_vec(), "video/mp4")
            .await
            .unwrap();
        assert_eq!(reference, key);

        let data = storage.get_file(&reference).await.unwrap();
        assert_eq!(data, b"movie bytes");
    }

    #[tokio::test]
    async fn presign_returns_a_file_url() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let url = storage
            .presign("videos/vid-1/720p/segment_000.ts", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("videos/vid-1/720p/segment_000.ts"));
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        assert!(storage.get_file("uploads/nope").await.is_err());
    }
}
