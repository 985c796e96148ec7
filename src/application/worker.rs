//! Bounded worker pool that drains the transcode job queue.

use crate::application::pipeline::TranscodeService;
use crate::domain::jobs::TranscodeJob;
use crate::domain::video::VideoStatus;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::{SegmentRepository, VideoRepository};
use crate::ports::storage::StoragePort;
use crate::ports::transcode::TranscodePort;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Fixed number of workers, each pulling one job at a time, so at most
/// that many pipelines run concurrently no matter how many uploads queue
/// up behind them.
pub struct WorkerPool<S, V, G, T, Q> {
    pipeline: Arc<TranscodeService<S, V, G, T>>,
    queue: Q,
    workers: usize,
    shutdown: CancellationToken,
}

impl<S, V, G, T, Q> WorkerPool<S, V, G, T, Q>
where
    S: StoragePort + 'static,
    V: VideoRepository + 'static,
    G: SegmentRepository + 'static,
    T: TranscodePort + 'static,
    Q: JobQueuePort + Clone + 'static,
{
    pub fn new(
        pipeline: Arc<TranscodeService<S, V, G, T>>,
        queue: Q,
        workers: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            queue,
            workers,
            shutdown,
        }
    }

    /// Spawn the configured number of workers. A job already running when
    /// shutdown is requested is finished, not interrupted.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        (0..self.workers.max(1))
            .map(|id| {
                let pipeline = self.pipeline.clone();
                let queue = self.queue.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    worker_loop(id, pipeline, queue, shutdown).await;
                })
            })
            .collect()
    }
}

async fn worker_loop<S, V, G, T, Q>(
    worker_id: usize,
    pipeline: Arc<TranscodeService<S, V, G, T>>,
    queue: Q,
    shutdown: CancellationToken,
) where
    S: StoragePort,
    V: VideoRepository,
    G: SegmentRepository,
    T: TranscodePort,
    Q: JobQueuePort,
{
    info!(worker_id, "transcode worker started");
    loop {
        let dequeued = tokio::select! {
            _ = shutdown.cancelled() => break,
            dequeued = queue.dequeue() => dequeued,
        };
        match dequeued {
            Ok(Some(job)) => {
                info!(worker_id, video_id = %job.video_id, "picked up transcode job");
                if let Err(err) = pipeline
                    .process_video(&job.video_id, &job.original_key)
                    .await
                {
                    // The video already settled at `failed`; nothing to
                    // retry here.
                    error!(worker_id, video_id = %job.video_id, error = %err, "transcode job failed");
                }
            }
            Ok(None) => break,
            Err(err) => {
                error!(worker_id, error = %err, "queue error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    info!(worker_id, "transcode worker stopped");
}

/// Re-enqueue videos whose pipeline never reached a terminal status, so a
/// restart picks up where the previous process stopped. Segment rows from
/// an interrupted run are replaced when the rendition is rebuilt.
pub async fn recover_pending<V, Q>(
    videos: &V,
    queue: &Q,
) -> Result<usize, Box<dyn Error + Send + Sync>>
where
    V: VideoRepository,
    Q: JobQueuePort,
{
    let stuck = videos
        .list_in_status(&[VideoStatus::Uploaded, VideoStatus::Processing])
        .await?;
    for video in &stuck {
        queue
            .enqueue(TranscodeJob {
                video_id: video.id.clone(),
                original_key: video.original_url.clone(),
            })
            .await?;
    }
    Ok(stuck.len())
}
