//! FFmpeg/FFprobe subprocess adapter implementing the transcode port.

use crate::domain::segment::Resolution;
use crate::ports::transcode::{MediaInfo, TranscodePort};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Errors from driving the external ffmpeg/ffprobe binaries.
#[derive(Debug)]
pub enum ToolError {
    Io(std::io::Error),
    /// Process exited non-zero; carries the tool name and trailing stderr.
    Failed { tool: &'static str, detail: String },
    /// The tool ran but printed something we could not interpret.
    Parse(String),
    /// The segmenter exited zero but produced no files for the pattern.
    NoOutput(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Io(e) => write!(f, "could not run tool: {}", e),
            ToolError::Failed { tool, detail } => write!(f, "{} failed: {}", tool, detail),
            ToolError::Parse(e) => write!(f, "unparseable tool output: {}", e),
            ToolError::NoOutput(pattern) => {
                write!(f, "segmenter produced no files matching {}", pattern)
            }
        }
    }
}

impl Error for ToolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ToolError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Io(err)
    }
}

/// Runs ffmpeg/ffprobe as child processes; each invocation blocks the
/// calling pipeline until the process exits.
#[derive(Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl TranscodePort for FfmpegTranscoder {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, Box<dyn Error + Send + Sync>> {
        let duration_out = Command::new(&self.ffprobe_path)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await
            .map_err(ToolError::Io)?;
        if !duration_out.status.success() {
            return Err(command_failure("ffprobe", &duration_out).into());
        }
        let duration = parse_duration(&String::from_utf8_lossy(&duration_out.stdout))?;

        let dimensions_out = Command::new(&self.ffprobe_path)
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=width,height")
            .arg("-of")
            .arg("csv=s=x:p=0")
            .arg(path)
            .output()
            .await
            .map_err(ToolError::Io)?;
        if !dimensions_out.status.success() {
            return Err(command_failure("ffprobe", &dimensions_out).into());
        }
        let (width, height) = parse_dimensions(&String::from_utf8_lossy(&dimensions_out.stdout))?;

        Ok(MediaInfo {
            duration,
            width,
            height,
        })
    }

    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (width, height) = resolution.dimensions();
        let result = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(input)
            .arg("-c:v")
            .arg("libx264")
            .arg("-vf")
            .arg(format!("scale={}:{}", width, height))
            .arg("-r")
            .arg(fps.to_string())
            .arg("-c:a")
            .arg("aac")
            .arg("-b:a")
            .arg("128k")
            .arg("-movflags")
            .arg("+faststart")
            .arg("-y")
            .arg(output)
            .output()
            .await
            .map_err(ToolError::Io)?;
        if !result.status.success() {
            return Err(command_failure("ffmpeg", &result).into());
        }
        Ok(())
    }

    async fn segment(
        &self,
        input: &Path,
        chunk_seconds: u32,
        output_pattern: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn Error + Send + Sync>> {
        let dir = output_pattern
            .parent()
            .ok_or_else(|| ToolError::Parse("output pattern has no parent directory".to_string()))?;
        tokio::fs::create_dir_all(dir).await.map_err(ToolError::Io)?;

        let result = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(input)
            .arg("-c")
            .arg("copy")
            .arg("-map")
            .arg("0")
            .arg("-f")
            .arg("segment")
            .arg("-segment_time")
            .arg(chunk_seconds.to_string())
            .arg("-segment_format")
            .arg("mpegts")
            .arg("-segment_list")
            .arg(dir.join("playlist.m3u8"))
            .arg("-segment_list_type")
            .arg("m3u8")
            .arg(output_pattern)
            .output()
            .await
            .map_err(ToolError::Io)?;
        if !result.status.success() {
            return Err(command_failure("ffmpeg", &result).into());
        }

        let chunks = list_chunks(output_pattern).await?;
        Ok(chunks)
    }
}

fn command_failure(tool: &'static str, output: &Output) -> ToolError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut tail: Vec<&str> = stderr.lines().rev().take(6).collect();
    tail.reverse();
    ToolError::Failed {
        tool,
        detail: tail.join("\n"),
    }
}

fn parse_duration(raw: &str) -> Result<f64, ToolError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ToolError::Parse(format!("unexpected duration output: {:?}", raw)))
}

fn parse_dimensions(raw: &str) -> Result<(u32, u32), ToolError> {
    let trimmed = raw.trim();
    let (width, height) = trimmed
        .split_once('x')
        .ok_or_else(|| ToolError::Parse(format!("unexpected dimensions output: {:?}", trimmed)))?;
    let width = width
        .parse::<u32>()
        .map_err(|_| ToolError::Parse(format!("unexpected width: {:?}", width)))?;
    let height = height
        .parse::<u32>()
        .map_err(|_| ToolError::Parse(format!("unexpected height: {:?}", height)))?;
    Ok((width, height))
}

/// Expand a `%03d`-style pattern into the files ffmpeg produced, in
/// playback order. The zero-padded counter makes lexicographic order
/// chronological.
async fn list_chunks(pattern: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let dir = pattern
        .parent()
        .ok_or_else(|| ToolError::Parse("output pattern has no parent directory".to_string()))?;
    let name = pattern
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ToolError::Parse(format!("invalid output pattern: {:?}", pattern)))?;
    let (prefix, suffix) = name
        .split_once("%03d")
        .ok_or_else(|| ToolError::Parse(format!("pattern {:?} has no %03d counter", name)))?;

    let mut chunks = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(ToolError::Io)?;
    while let Some(entry) = entries.next_entry().await.map_err(ToolError::Io)? {
        let file_name = entry.file_name();
        if let Some(file_name) = file_name.to_str() {
            if file_name.len() > prefix.len() + suffix.len()
                && file_name.starts_with(prefix)
                && file_name.ends_with(suffix)
            {
                chunks.push(entry.path());
            }
        }
    }
    if chunks.is_empty() {
        return Err(ToolError::NoOutput(pattern.display().to_string()));
    }
    chunks.sort();
    Ok(chunks)
}
