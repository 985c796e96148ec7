//! Upload orchestration: store the original, create the record, enqueue
//! the pipeline.

use crate::domain::jobs::TranscodeJob;
use crate::domain::video::Video;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::StoragePort;
use regex::Regex;
use std::error::Error;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Raw upload as received from the boundary layer, which has already
/// checked that the bytes and owning user are non-empty.
#[derive(Debug, Clone)]
pub struct UploadInput {
    pub title: String,
    pub description: String,
    pub data: Vec<u8>,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub user_id: String,
}

pub struct UploadService<S, V, Q> {
    storage: S,
    videos: V,
    queue: Q,
}

impl<S, V, Q> UploadService<S, V, Q>
where
    S: StoragePort,
    V: VideoRepository,
    Q: JobQueuePort,
{
    pub fn new(storage: S, videos: V, queue: Q) -> Self {
        Self {
            storage,
            videos,
            queue,
        }
    }

    /// Store the original, persist the metadata record in `uploaded`, and
    /// enqueue exactly one pipeline run. Returns without waiting for the
    /// pipeline; its failures are only visible through the video's status.
    pub async fn upload_video(
        &self,
        input: UploadInput,
    ) -> Result<Video, Box<dyn Error + Send + Sync>> {
        let video_id = Uuid::new_v4().to_string();
        let file_name = sanitize_file_name(&input.file_name);
        let key = format!("uploads/{}/original/{}", video_id, file_name);
        let original_url = self
            .storage
            .upload_file(&key, input.data, &input.mime_type)
            .await?;

        let video = Video::new(
            video_id,
            input.title,
            input.description,
            original_url.clone(),
            input.file_size,
            input.mime_type,
            input.user_id,
        );
        self.videos.create(&video).await?;

        self.queue
            .enqueue(TranscodeJob {
                video_id: video.id.clone(),
                original_key: original_url,
            })
            .await?;

        info!(video_id = %video.id, "upload stored, pipeline enqueued");
        Ok(video)
    }
}

/// Reduce an uploaded file name to its base name with a conservative
/// character set, so it can be embedded in a storage key.
fn sanitize_file_name(raw: &str) -> String {
    let base = Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let pattern = Regex::new(r"[^A-Za-z0-9._-]+").expect("valid file name pattern");
    let cleaned = pattern.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        String::from("upload.bin")
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::video::VideoStatus;
    use crate::ports::queue::MockJobQueuePort;
    use crate::ports::repository::MockVideoRepository;
    use crate::ports::storage::MockStoragePort;
    use std::sync::{Arc, Mutex};

    fn input() -> UploadInput {
        UploadInput {
            title: "A title".to_string(),
            description: "A description".to_string(),
            data: b"movie bytes".to_vec(),
            file_name: "holiday clip.mp4".to_string(),
            file_size: 11,
            mime_type: "video/mp4".to_string(),
            user_id: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn upload_stores_persists_and_enqueues() {
        let keys: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut storage = MockStoragePort::new();
        let recorded_keys = keys.clone();
        storage
            .expect_upload_file()
            .withf(|key, data, content_type| {
                key.starts_with("uploads/")
                    && key.ends_with("/original/holiday_clip.mp4")
                    && data == b"movie bytes"
                    && content_type == "video/mp4"
            })
            .returning(move |key, _, _| {
                recorded_keys.lock().unwrap().push(key.to_string());
                Ok(key.to_string())
            });

        let created: Arc<Mutex<Vec<Video>>> = Arc::new(Mutex::new(Vec::new()));
        let mut videos = MockVideoRepository::new();
        let recorded_videos = created.clone();
        videos.expect_create().returning(move |video| {
            recorded_videos.lock().unwrap().push(video.clone());
            Ok(())
        });

        let jobs: Arc<Mutex<Vec<TranscodeJob>>> = Arc::new(Mutex::new(Vec::new()));
        let mut queue = MockJobQueuePort::new();
        let recorded_jobs = jobs.clone();
        queue.expect_enqueue().returning(move |job| {
            recorded_jobs.lock().unwrap().push(job);
            Ok(())
        });

        let service = UploadService::new(storage, videos, queue);
        let video = service.upload_video(input()).await.unwrap();

        assert_eq!(video.status, VideoStatus::Uploaded);
        assert_eq!(video.duration, 0.0);

        let created = created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, video.id);
        assert_eq!(created[0].user_id, "user-1");
        assert_eq!(created[0].file_size, 11);

        let jobs = jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].video_id, video.id);
        assert_eq!(jobs[0].original_key, keys.lock().unwrap()[0]);
    }

    #[tokio::test]
    async fn uploads_from_different_users_stay_independent() {
        let mut storage = MockStoragePort::new();
        storage
            .expect_upload_file()
            .returning(|key, _, _| Ok(key.to_string()));

        let created: Arc<Mutex<Vec<Video>>> = Arc::new(Mutex::new(Vec::new()));
        let mut videos = MockVideoRepository::new();
        let recorded_videos = created.clone();
        videos.expect_create().returning(move |video| {
            recorded_videos.lock().unwrap().push(video.clone());
            Ok(())
        });

        let mut queue = MockJobQueuePort::new();
        queue.expect_enqueue().returning(|_| Ok(()));

        let service = UploadService::new(storage, videos, queue);
        let first = service.upload_video(input()).await.unwrap();
        let mut second_input = input();
        second_input.user_id = "user-2".to_string();
        let second = service.upload_video(second_input).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_ne!(first.original_url, second.original_url);

        let created = created.lock().unwrap();
        assert_eq!(created[0].user_id, "user-1");
        assert_eq!(created[1].user_id, "user-2");
        assert!(created[1].original_url.contains(&second.id));
    }

    #[tokio::test]
    async fn storage_failure_aborts_before_any_record_exists() {
        let mut storage = MockStoragePort::new();
        storage
            .expect_upload_file()
            .returning(|_, _, _| Err("bucket unavailable".into()));

        let mut videos = MockVideoRepository::new();
        videos.expect_create().times(0);
        let mut queue = MockJobQueuePort::new();
        queue.expect_enqueue().times(0);

        let service = UploadService::new(storage, videos, queue);
        assert!(service.upload_video(input()).await.is_err());
    }

    #[tokio::test]
    async fn persist_failure_aborts_before_enqueue() {
        let mut storage = MockStoragePort::new();
        storage
            .expect_upload_file()
            .returning(|key, _, _| Ok(key.to_string()));

        let mut videos = MockVideoRepository::new();
        videos
            .expect_create()
            .returning(|_| Err("insert failed".into()));
        let mut queue = MockJobQueuePort::new();
        queue.expect_enqueue().times(0);

        let service = UploadService::new(storage, videos, queue);
        assert!(service.upload_video(input()).await.is_err());
    }

    #[test]
    fn file_names_lose_directories_and_odd_characters() {
        assert_eq!(
            sanitize_file_name("../../etc/evil name.mp4"),
            "evil_name.mp4"
        );
        assert_eq!(sanitize_file_name("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_file_name("mes vacances (1).mov"), "mes_vacances_1_.mov");
        assert_eq!(sanitize_file_name(".."), "upload.bin");
        assert_eq!(sanitize_file_name("???"), "upload.bin");
        assert_eq!(sanitize_file_name(""), "upload.bin");
    }
}
