use async_trait::async_trait;
use std::error::Error;
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Store raw bytes at `key`, returning the artifact reference.
    async fn upload_file(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Fetch the raw bytes behind an artifact reference.
    async fn get_file(&self, key: &str) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>>;

    /// Time-limited URL for direct access to a stored artifact.
    async fn presign(
        &self,
        key: &str,
        expiry: Duration,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}
