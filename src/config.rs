//! Environment configuration.

use crate::domain::segment::Resolution;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
}

/// Which storage adapter main() wires in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the local backend
    pub local_root: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    pub endpoint: String,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Quality ladder, processed in order.
    pub resolutions: Vec<Resolution>,
    /// Nominal chunk length in seconds.
    pub segment_seconds: u32,
    /// Output frame rate for every rendition.
    pub fps: u32,
    /// Worker pool size; at most this many pipelines run at once.
    pub max_concurrent_jobs: usize,
}

impl Config {
    /// Load configuration from environment variables, with defaults that
    /// work for local development.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            server: ServerConfig {
                addr: env_or("ADDR", "127.0.0.1"),
                port: env_or("PORT", "8080"),
            },
            storage: StorageConfig {
                backend: match env_or("STORAGE_BACKEND", "local").as_str() {
                    "s3" => StorageBackend::S3,
                    _ => StorageBackend::Local,
                },
                local_root: env_or("STORAGE_LOCAL_ROOT", "./data"),
                access_key: env_or("STORAGE_ACCESS_KEY", "minioadmin"),
                secret_key: env_or("STORAGE_SECRET_KEY", "minioadmin"),
                region: env_or("STORAGE_REGION", "us-east-1"),
                bucket: env_or("STORAGE_BUCKET_NAME", "videos"),
                endpoint: env_or("STORAGE_ENDPOINT", "http://localhost:9000"),
            },
            pipeline: PipelineConfig {
                ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg"),
                ffprobe_path: env_or("FFPROBE_PATH", "ffprobe"),
                resolutions: parse_resolutions(&env_or("RESOLUTIONS", "1080p,720p")),
                segment_seconds: env_parse("SEGMENT_DURATION", 10),
                fps: env_parse("OUTPUT_FPS", 24),
                max_concurrent_jobs: env_parse("MAX_CONCURRENT_TRANSCODES", 2),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| String::from(default))
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Comma-separated quality tags; unknown tags fall back to 720p and an
/// empty list falls back to the default ladder.
fn parse_resolutions(raw: &str) -> Vec<Resolution> {
    let ladder: Vec<Resolution> = raw
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(Resolution::from_tag)
        .collect();
    if ladder.is_empty() {
        vec![Resolution::P1080, Resolution::P720]
    } else {
        ladder
    }
}
