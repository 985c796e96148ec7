use serde::{Deserialize, Serialize};

/// Queue payload for one transcode pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub video_id: String,
    /// Artifact reference of the stored original.
    pub original_key: String,
}
