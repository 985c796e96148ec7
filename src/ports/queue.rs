use crate::domain::jobs::TranscodeJob;
use async_trait::async_trait;
use std::error::Error;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue one pipeline run.
    async fn enqueue(&self, job: TranscodeJob) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Wait for the next job. `Ok(None)` means the queue has shut down.
    async fn dequeue(&self) -> Result<Option<TranscodeJob>, Box<dyn Error + Send + Sync>>;
}
