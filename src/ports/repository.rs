use crate::domain::segment::{Resolution, Segment};
use crate::domain::video::{Video, VideoStatus};
use async_trait::async_trait;
use std::error::Error;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: &Video) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Video>, Box<dyn Error + Send + Sync>>;

    /// Persist the current state of `video`. Each call is one discrete
    /// write; readers may observe any intermediate state between calls.
    async fn update(&self, video: &Video) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Video>, Box<dyn Error + Send + Sync>>;

    /// Videos currently in one of `statuses`, for startup recovery.
    async fn list_in_status(
        &self,
        statuses: &[VideoStatus],
    ) -> Result<Vec<Video>, Box<dyn Error + Send + Sync>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SegmentRepository: Send + Sync {
    async fn create(&self, segment: &Segment) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// All segments of a video, ordered by segment index.
    async fn list_by_video(
        &self,
        video_id: &str,
    ) -> Result<Vec<Segment>, Box<dyn Error + Send + Sync>>;

    async fn list_by_video_and_resolution(
        &self,
        video_id: &str,
        resolution: Resolution,
    ) -> Result<Vec<Segment>, Box<dyn Error + Send + Sync>>;

    /// Remove one (video, resolution) group before it is rebuilt.
    /// Returns how many rows were removed.
    async fn delete_by_video_and_resolution(
        &self,
        video_id: &str,
        resolution: Resolution,
    ) -> Result<u64, Box<dyn Error + Send + Sync>>;
}
