//! In-memory metadata store for single-host deployments and tests.
//!
//! Every call takes the lock once, so each write is a discrete atomic
//! update; there is no transaction spanning multiple calls.

use crate::domain::segment::{Resolution, Segment};
use crate::domain::video::{Video, VideoStatus};
use crate::ports::repository::{SegmentRepository, VideoRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
pub enum MetadataError {
    Duplicate(String),
    Missing(String),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::Duplicate(id) => write!(f, "video {} already exists", id),
            MetadataError::Missing(id) => write!(f, "video {} does not exist", id),
        }
    }
}

impl Error for MetadataError {}

#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    videos: Arc<RwLock<HashMap<String, Video>>>,
    segments: Arc<RwLock<Vec<Segment>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoRepository for InMemoryMetadataStore {
    async fn create(&self, video: &Video) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.id) {
            return Err(MetadataError::Duplicate(video.id.clone()).into());
        }
        videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Video>, Box<dyn Error + Send + Sync>> {
        Ok(self.videos.read().await.get(id).cloned())
    }

    async fn update(&self, video: &Video) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut videos = self.videos.write().await;
        if !videos.contains_key(&video.id) {
            return Err(MetadataError::Missing(video.id.clone()).into());
        }
        videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Video>, Box<dyn Error + Send + Sync>> {
        let videos = self.videos.read().await;
        let mut owned: Vec<Video> = videos
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_in_status(
        &self,
        statuses: &[VideoStatus],
    ) -> Result<Vec<Video>, Box<dyn Error + Send + Sync>> {
        let videos = self.videos.read().await;
        Ok(videos
            .values()
            .filter(|v| statuses.contains(&v.status))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SegmentRepository for InMemoryMetadataStore {
    async fn create(&self, segment: &Segment) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.segments.write().await.push(segment.clone());
        Ok(())
    }

    async fn list_by_video(
        &self,
        video_id: &str,
    ) -> Result<Vec<Segment>, Box<dyn Error + Send + Sync>> {
        let segments = self.segments.read().await;
        let mut rows: Vec<Segment> = segments
            .iter()
            .filter(|s| s.video_id == video_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.segment_index
                .cmp(&b.segment_index)
                .then_with(|| a.resolution.as_str().cmp(b.resolution.as_str()))
        });
        Ok(rows)
    }

    async fn list_by_video_and_resolution(
        &self,
        video_id: &str,
        resolution: Resolution,
    ) -> Result<Vec<Segment>, Box<dyn Error + Send + Sync>> {
        let segments = self.segments.read().await;
        let mut rows: Vec<Segment> = segments
            .iter()
            .filter(|s| s.video_id == video_id && s.resolution == resolution)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.segment_index);
        Ok(rows)
    }

    async fn delete_by_video_and_resolution(
        &self,
        video_id: &str,
        resolution: Resolution,
    ) -> Result<u64, Box<dyn Error + Send + Sync>> {
        let mut segments = self.segments.write().await;
        let before = segments.len();
        segments.retain(|s| !(s.video_id == video_id && s.resolution == resolution));
        Ok((before - segments.len()) as u64)
    }
}
