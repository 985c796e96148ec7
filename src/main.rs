//! caruso server binary.
//!
//! Wires the boundary layer around the core: an axum upload/read surface,
//! the storage backend picked by configuration, the in-memory metadata
//! store, the in-process job queue and the transcode worker pool. Requests
//! only do simple mapping; the sequencing lives in the application layer.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use caruso::adapters::ffmpeg::FfmpegTranscoder;
use caruso::adapters::fs::FsStorage;
use caruso::adapters::memory::InMemoryMetadataStore;
use caruso::adapters::queue::ChannelQueue;
use caruso::adapters::s3::S3Storage;
use caruso::application::pipeline::{TranscodeService, TranscodeSettings};
use caruso::application::upload::{UploadInput, UploadService};
use caruso::application::worker::{recover_pending, WorkerPool};
use caruso::config::{Config, StorageBackend};
use caruso::domain::segment::Resolution;
use caruso::ports::repository::{SegmentRepository, VideoRepository};
use caruso::ports::storage::StoragePort;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lifetime of presigned playback URLs.
const PLAYBACK_TTL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match config.storage.backend {
        StorageBackend::S3 => serve(S3Storage::from_config(&config.storage), config).await,
        StorageBackend::Local => {
            serve(FsStorage::new(&config.storage.local_root), config).await
        }
    }
}

struct AppState<S> {
    upload: Arc<UploadService<S, InMemoryMetadataStore, ChannelQueue>>,
    store: InMemoryMetadataStore,
    storage: S,
}

impl<S: Clone> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            upload: self.upload.clone(),
            store: self.store.clone(),
            storage: self.storage.clone(),
        }
    }
}

async fn serve<S>(storage: S, config: Config)
where
    S: StoragePort + Clone + 'static,
{
    let store = InMemoryMetadataStore::new();
    let queue = ChannelQueue::new();
    let transcoder =
        FfmpegTranscoder::new(&config.pipeline.ffmpeg_path, &config.pipeline.ffprobe_path);
    let settings = TranscodeSettings {
        resolutions: config.pipeline.resolutions.clone(),
        segment_seconds: config.pipeline.segment_seconds,
        fps: config.pipeline.fps,
    };

    let pipeline = Arc::new(TranscodeService::new(
        storage.clone(),
        store.clone(),
        store.clone(),
        transcoder,
        settings,
    ));
    let upload = Arc::new(UploadService::new(
        storage.clone(),
        store.clone(),
        queue.clone(),
    ));

    match recover_pending(&store, &queue).await {
        Ok(0) => {}
        Ok(count) => info!(count, "re-enqueued unfinished pipelines"),
        Err(err) => warn!(error = %err, "pending-pipeline recovery failed"),
    }

    let shutdown = CancellationToken::new();
    let pool = WorkerPool::new(
        pipeline,
        queue.clone(),
        config.pipeline.max_concurrent_jobs,
        shutdown.clone(),
    );
    let workers = pool.start();
    info!(workers = workers.len(), "transcode workers started");

    let state = AppState {
        upload,
        store,
        storage,
    };
    let app = Router::new()
        .route("/videos", post(upload_video::<S>).get(list_videos::<S>))
        .route("/videos/:id", get(get_video::<S>))
        .route("/videos/:id/segments", get(get_segments::<S>))
        .layer(DefaultBodyLimit::disable())
        .with_state(state);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.server.addr, config.server.port))
            .await
            .expect("Failed to bind TCP listener");
    info!(addr = %config.server.addr, port = %config.server.port, "listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            server_shutdown.cancel();
        })
        .await
        .expect("Server failed to start");

    // Let workers finish the jobs they hold before exiting.
    shutdown.cancel();
    for handle in workers {
        let _ = handle.await;
    }
}

fn user_from_headers(headers: &HeaderMap) -> String {
    // Auth lives upstream; the gateway forwards the caller identity.
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

// Handler that accepts a multipart form upload and hands it to the upload
// orchestration.
async fn upload_video<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, String)>
where
    S: StoragePort + Clone + 'static,
{
    let user_id = user_from_headers(&headers);
    let mut title = String::from("Untitled Video");
    let mut description = String::new();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            }
            Some("description") => {
                description = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            }
            Some("video") => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
                    .to_vec();
                file = Some((file_name, mime_type, data));
            }
            _ => {}
        }
    }

    let (file_name, mime_type, data) =
        file.ok_or((StatusCode::BAD_REQUEST, "missing video field".to_string()))?;
    if data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "empty video upload".to_string()));
    }

    let input = UploadInput {
        title,
        description,
        file_size: data.len() as i64,
        data,
        file_name,
        mime_type,
        user_id,
    };
    let video = state
        .upload
        .upload_video(input)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({
        "message": "Video upload accepted. Processing has begun.",
        "video_id": video.id,
        "status": video.status,
    })))
}

async fn get_video<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)>
where
    S: StoragePort + Clone + 'static,
{
    let video = state
        .store
        .get_by_id(&id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "video not found".to_string()))?;

    let segments = match state.store.list_by_video(&id).await {
        Ok(segments) => segments,
        Err(err) => {
            warn!(video_id = %id, error = %err, "could not list segments");
            Vec::new()
        }
    };

    Ok(Json(json!({ "video": video, "segments": segments })))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_videos<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, (StatusCode, String)>
where
    S: StoragePort + Clone + 'static,
{
    let user_id = user_from_headers(&headers);
    let videos = state
        .store
        .list_by_user(&user_id, params.limit.unwrap_or(10), params.offset.unwrap_or(0))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({ "videos": videos })))
}

#[derive(Debug, Deserialize)]
struct SegmentParams {
    resolution: Option<String>,
}

async fn get_segments<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<SegmentParams>,
) -> Result<Json<Value>, (StatusCode, String)>
where
    S: StoragePort + Clone + 'static,
{
    let segments = match params.resolution.as_deref() {
        Some(tag) => state
            .store
            .list_by_video_and_resolution(&id, Resolution::from_tag(tag))
            .await,
        None => state.store.list_by_video(&id).await,
    }
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut items = Vec::with_capacity(segments.len());
    for segment in segments {
        let playback_url = match state.storage.presign(&segment.url, PLAYBACK_TTL).await {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(video_id = %segment.video_id, error = %err, "presign failed");
                None
            }
        };
        items.push(json!({ "segment": segment, "playback_url": playback_url }));
    }
    Ok(Json(json!({ "segments": items })))
}
