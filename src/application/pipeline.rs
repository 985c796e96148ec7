//! The transcode pipeline: probe, per-resolution encode/segment/upload,
//! best-effort thumbnail, terminal status.

use crate::domain::segment::{chunk_timing, Resolution, Segment};
use crate::domain::video::{Video, VideoStatus};
use crate::ports::repository::{SegmentRepository, VideoRepository};
use crate::ports::storage::StoragePort;
use crate::ports::transcode::TranscodePort;
use chrono::Utc;
use std::error::Error;
use std::fmt;
use std::path::Path;
use tempfile::TempDir;
use tracing::{error, info, warn};
use uuid::Uuid;

const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";
const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Failure categories for one pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    /// Referenced video id is absent from the metadata store.
    VideoNotFound(String),
    /// Artifact download/upload or workspace file I/O failed.
    Transport(Box<dyn Error + Send + Sync>),
    /// An external probe/encode/segment invocation failed.
    Tool(Box<dyn Error + Send + Sync>),
    /// A metadata store write failed on the critical path.
    Persistence(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::VideoNotFound(id) => write!(f, "video {} not found", id),
            PipelineError::Transport(e) => write!(f, "transport error: {}", e),
            PipelineError::Tool(e) => write!(f, "external tool error: {}", e),
            PipelineError::Persistence(e) => write!(f, "persistence error: {}", e),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::VideoNotFound(_) => None,
            PipelineError::Transport(e)
            | PipelineError::Tool(e)
            | PipelineError::Persistence(e) => Some(e.as_ref()),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Transport(Box::new(err))
    }
}

/// Quality ladder and chunking parameters, resolved once at startup.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    /// Renditions to produce, processed strictly in this order.
    pub resolutions: Vec<Resolution>,
    /// Nominal chunk length in seconds.
    pub segment_seconds: u32,
    /// Output frame rate for every rendition.
    pub fps: u32,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            resolutions: vec![Resolution::P1080, Resolution::P720],
            segment_seconds: 10,
            fps: 24,
        }
    }
}

/// Drives the end-to-end pipeline for one video.
///
/// A run owns a private scratch directory that is released on every exit
/// path. Renditions are processed one at a time; there is no rollback of
/// artifacts already uploaded when a later step fails.
pub struct TranscodeService<S, V, G, T> {
    storage: S,
    videos: V,
    segments: G,
    transcoder: T,
    settings: TranscodeSettings,
}

impl<S, V, G, T> TranscodeService<S, V, G, T>
where
    S: StoragePort,
    V: VideoRepository,
    G: SegmentRepository,
    T: TranscodePort,
{
    pub fn new(storage: S, videos: V, segments: G, transcoder: T, settings: TranscodeSettings) -> Self {
        Self {
            storage,
            videos,
            segments,
            transcoder,
            settings,
        }
    }

    /// Run the pipeline for `(video_id, original_key)`. On any fatal error
    /// the video settles at `failed`; only a missing video skips the status
    /// write, since there is no row to update.
    pub async fn process_video(
        &self,
        video_id: &str,
        original_key: &str,
    ) -> Result<(), PipelineError> {
        let mut video = self
            .videos
            .get_by_id(video_id)
            .await
            .map_err(PipelineError::Persistence)?
            .ok_or_else(|| PipelineError::VideoNotFound(video_id.to_string()))?;

        match self.run(&mut video, original_key).await {
            Ok(()) => {
                info!(video_id, "pipeline complete");
                Ok(())
            }
            Err(err) => {
                error!(video_id, error = %err, "pipeline failed");
                video.status = VideoStatus::Failed;
                video.touch();
                if let Err(update_err) = self.videos.update(&video).await {
                    warn!(video_id, error = %update_err, "could not record failed status");
                }
                Err(err)
            }
        }
    }

    async fn run(&self, video: &mut Video, original_key: &str) -> Result<(), PipelineError> {
        video.status = VideoStatus::Processing;
        video.touch();
        if let Err(err) = self.videos.update(video).await {
            // Not fatal; the next status write will bring the row forward.
            warn!(video_id = %video.id, error = %err, "could not record processing status");
        }

        let workspace = TempDir::new()?;

        let original = self
            .storage
            .get_file(original_key)
            .await
            .map_err(PipelineError::Transport)?;
        let original_path = workspace.path().join("original.mp4");
        tokio::fs::write(&original_path, &original).await?;

        let info = self
            .transcoder
            .probe(&original_path)
            .await
            .map_err(PipelineError::Tool)?;
        video.duration = info.duration;
        video.resolution_info = format!("{}x{}", info.width, info.height);
        video.status = VideoStatus::Transcoded;
        video.touch();
        self.videos
            .update(video)
            .await
            .map_err(PipelineError::Persistence)?;
        info!(
            video_id = %video.id,
            duration = info.duration,
            resolution = %video.resolution_info,
            "probed original"
        );

        for &resolution in &self.settings.resolutions {
            self.process_resolution(video, &original_path, workspace.path(), resolution)
                .await?;
        }

        self.attach_thumbnail(video, workspace.path()).await;

        video.status = VideoStatus::Complete;
        video.touch();
        self.videos
            .update(video)
            .await
            .map_err(PipelineError::Persistence)?;
        Ok(())
    }

    async fn process_resolution(
        &self,
        video: &Video,
        original_path: &Path,
        workspace: &Path,
        resolution: Resolution,
    ) -> Result<(), PipelineError> {
        let encoded_path = workspace.join(format!("{}.mp4", resolution));
        self.transcoder
            .encode(original_path, &encoded_path, resolution, self.settings.fps)
            .await
            .map_err(PipelineError::Tool)?;

        let chunk_dir = workspace.join(resolution.as_str());
        tokio::fs::create_dir_all(&chunk_dir).await?;
        let pattern = chunk_dir.join("segment_%03d.ts");
        let chunk_paths = self
            .transcoder
            .segment(&encoded_path, self.settings.segment_seconds, &pattern)
            .await
            .map_err(PipelineError::Tool)?;

        // Replace whatever an earlier run left behind for this rendition.
        let removed = self
            .segments
            .delete_by_video_and_resolution(&video.id, resolution)
            .await
            .map_err(PipelineError::Persistence)?;
        if removed > 0 {
            warn!(
                video_id = %video.id,
                resolution = %resolution,
                removed,
                "replaced segments from a previous run"
            );
        }

        let nominal = f64::from(self.settings.segment_seconds);
        for (index, chunk_path) in chunk_paths.iter().enumerate() {
            let file_name = chunk_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    PipelineError::Tool(
                        format!("chunk path {:?} has no file name", chunk_path).into(),
                    )
                })?;
            let data = tokio::fs::read(chunk_path).await?;
            let key = format!("videos/{}/{}/{}", video.id, resolution, file_name);
            let url = self
                .storage
                .upload_file(&key, data, SEGMENT_CONTENT_TYPE)
                .await
                .map_err(PipelineError::Transport)?;

            let (start_time, duration) =
                chunk_timing(index, chunk_paths.len(), video.duration, nominal);
            let segment = Segment {
                id: Uuid::new_v4().to_string(),
                video_id: video.id.clone(),
                file_name: file_name.to_string(),
                url,
                resolution,
                start_time,
                duration,
                segment_index: index,
                created_at: Utc::now(),
            };
            self.segments
                .create(&segment)
                .await
                .map_err(PipelineError::Persistence)?;
        }

        info!(
            video_id = %video.id,
            resolution = %resolution,
            chunks = chunk_paths.len(),
            "rendition uploaded"
        );
        Ok(())
    }

    /// Nothing in the pipeline generates a thumbnail; if some upstream step
    /// left `thumbnail.jpg` in the workspace it is uploaded and attached,
    /// otherwise this is a no-op. Failures never change the run's outcome.
    async fn attach_thumbnail(&self, video: &mut Video, workspace: &Path) {
        let data = match tokio::fs::read(workspace.join("thumbnail.jpg")).await {
            Ok(data) => data,
            Err(_) => return,
        };
        let key = format!("videos/{}/thumbnail.jpg", video.id);
        match self
            .storage
            .upload_file(&key, data, THUMBNAIL_CONTENT_TYPE)
            .await
        {
            Ok(url) => video.thumbnail_url = Some(url),
            Err(err) => {
                warn!(video_id = %video.id, error = %err, "thumbnail upload failed");
            }
        }
    }
}
