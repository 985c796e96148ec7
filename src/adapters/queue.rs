//! In-process job queue backed by an unbounded channel.
//!
//! Workers share the single receiver behind a mutex, so each job is
//! delivered to exactly one of them.

use crate::domain::jobs::TranscodeJob;
use crate::ports::queue::JobQueuePort;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug)]
pub struct QueueClosed;

impl fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("job queue is closed")
    }
}

impl Error for QueueClosed {}

#[derive(Clone)]
pub struct ChannelQueue {
    tx: mpsc::UnboundedSender<TranscodeJob>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<TranscodeJob>>>,
}

impl ChannelQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueuePort for ChannelQueue {
    async fn enqueue(&self, job: TranscodeJob) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.tx.send(job).map_err(|_| QueueClosed)?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<TranscodeJob>, Box<dyn Error + Send + Sync>> {
        Ok(self.rx.lock().await.recv().await)
    }
}
