use crate::domain::segment::Resolution;
use async_trait::async_trait;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Technical metadata extracted from a media container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodePort: Send + Sync {
    /// Duration and frame dimensions of the media file at `path`.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, Box<dyn Error + Send + Sync>>;

    /// Produce one rendition of `input` at the resolution's dimensions
    /// and the given frame rate, overwriting `output` if it exists.
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Split `input` into chunks of `chunk_seconds`, expanding the counter
    /// in `output_pattern`. The returned order is the playback order and
    /// defines the segment indices.
    async fn segment(
        &self,
        input: &Path,
        chunk_seconds: u32,
        output_pattern: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn Error + Send + Sync>>;
}
