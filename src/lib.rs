//! caruso - video upload and chunked-streaming transcode service.
//!
//! Hexagonal architecture:
//! - domain/: entities, the status lifecycle, chunk timing arithmetic
//! - ports/: trait contracts for the collaborators (metadata store,
//!   object storage, transcoder, job queue)
//! - adapters/: concrete implementations (ffmpeg subprocess, S3/MinIO,
//!   local filesystem, in-memory store, in-process queue)
//! - application/: upload orchestration, the transcode pipeline and the
//!   worker pool that drives it
//! - config: environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use domain::segment::{Resolution, Segment};
pub use domain::video::{Video, VideoStatus};
