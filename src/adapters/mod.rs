//! Concrete implementations of the collaborator ports.

pub mod ffmpeg;
pub mod fs;
pub mod memory;
pub mod queue;
pub mod s3;
