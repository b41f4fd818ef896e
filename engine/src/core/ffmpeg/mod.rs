//! FFmpeg Integration Module
//!
//! Every media operation of the pipeline goes through the system FFmpeg:
//! - Duration probing of synthesized voiceovers
//! - Still image → vertical video conversion
//! - Solid-color placeholder video
//! - Final reel composition with burned-in captions

mod detection;
mod runner;

pub use detection::{detect_ffmpeg, detect_system_ffmpeg, validate_ffmpeg, FFmpegInfo};
pub use runner::{
    build_compose_args, escape_filter_path, parse_probe_duration, CaptionBurnIn, FFmpegRunner,
    ReelRenderSettings,
};

use crate::core::CoreError;

/// FFmpeg-related error types
#[derive(Debug, thiserror::Error)]
pub enum FFmpegError {
    #[error("FFmpeg not found. Please install FFmpeg and make sure it is on PATH.")]
    NotFound,

    #[error("FFmpeg execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("Output path error: {0}")]
    OutputError(String),

    #[error("FFprobe error: {0}")]
    ProbeError(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Timeout: operation took too long")]
    Timeout,
}

pub type FFmpegResult<T> = Result<T, FFmpegError>;

impl From<FFmpegError> for CoreError {
    fn from(err: FFmpegError) -> Self {
        match err {
            FFmpegError::Timeout => CoreError::Timeout("FFmpeg operation".to_string()),
            FFmpegError::InvalidInput(msg) => CoreError::InvalidInput(msg),
            other => CoreError::CompositionFailed(other.to_string()),
        }
    }
}
