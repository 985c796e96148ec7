use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a video as it moves through the transcode pipeline.
///
/// Transitions are one-directional; `Complete` and `Failed` are terminal.
/// `Pending` and `Segmented` are persisted values the current pipeline
/// never assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Uploaded,
    Processing,
    Transcoded,
    Segmented,
    Complete,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Transcoded => "transcoded",
            VideoStatus::Segmented => "segmented",
            VideoStatus::Complete => "complete",
            VideoStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One media asset owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Seconds; 0.0 until the probe step has run.
    pub duration: f64,
    pub original_url: String,
    pub thumbnail_url: Option<String>,
    pub status: VideoStatus,
    pub file_size: i64,
    pub mime_type: String,
    pub user_id: String,
    /// "WIDTHxHEIGHT"; empty until the probe step has run.
    pub resolution_info: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// A freshly uploaded video: original stored, nothing probed yet.
    pub fn new(
        id: String,
        title: String,
        description: String,
        original_url: String,
        file_size: i64,
        mime_type: String,
        user_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description,
            duration: 0.0,
            original_url,
            thumbnail_url: None,
            status: VideoStatus::Uploaded,
            file_size,
            mime_type,
            user_id,
            resolution_info: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
