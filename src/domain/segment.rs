use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target quality levels for transcoded renditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
}

impl Resolution {
    /// Tag used in storage paths and segment records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P1080 => "1080p",
            Resolution::P720 => "720p",
        }
    }

    /// Pixel dimensions handed to the encoder.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::P1080 => (1920, 1080),
            Resolution::P720 => (1280, 720),
        }
    }

    /// Parse a quality tag; anything unrecognized falls back to 720p.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "1080p" => Resolution::P1080,
            _ => Resolution::P720,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playable chunk of one rendition of one video. Write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub video_id: String,
    pub file_name: String,
    pub url: String,
    pub resolution: Resolution,
    /// Seconds from the start of the rendition.
    pub start_time: f64,
    pub duration: f64,
    /// Zero-based position within the (video, resolution) group.
    pub segment_index: usize,
    pub created_at: DateTime<Utc>,
}

/// Start time and duration for the chunk at `index` out of `count` chunks
/// cut from a rendition `total` seconds long in `nominal`-second pieces.
///
/// Every chunk runs `nominal` seconds except possibly the last, which keeps
/// the remainder when the rendition does not divide evenly. An exact
/// multiple keeps the full nominal length; the duration is never zero or
/// negative.
pub fn chunk_timing(index: usize, count: usize, total: f64, nominal: f64) -> (f64, f64) {
    let start = index as f64 * nominal;
    let mut duration = nominal;
    if index + 1 == count {
        let remainder = total - start;
        if remainder > 0.0 && remainder < nominal {
            duration = remainder;
        }
    }
    (start, duration)
}
