//! ReelRun Error Definitions
//!
//! Defines error types used throughout the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =========================================================================
    // Generation Errors
    // =========================================================================
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    // =========================================================================
    // Composition Errors
    // =========================================================================
    #[error("Composition failed: {0}")]
    CompositionFailed(String),

    #[error("Caption timing failed: {0}")]
    CaptionTimingFailed(String),

    // =========================================================================
    // Run Control
    // =========================================================================
    #[error("Run cancelled")]
    Cancelled,

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse error classes used when routing a failure through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed configuration or arguments; never retried, never substituted
    InvalidInput,
    /// External service failure (including timeouts)
    Generation,
    /// Render-time failure
    Composition,
    /// Cooperative stop requested by the caller
    Cancelled,
}

impl CoreError {
    /// Classifies the error for fallback routing
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoreError::CompositionFailed(_) | CoreError::CaptionTimingFailed(_) => {
                ErrorKind::Composition
            }
            CoreError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Generation,
        }
    }

    /// Whether the error may be answered with a fallback value
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::InvalidInput | ErrorKind::Cancelled)
    }
}
