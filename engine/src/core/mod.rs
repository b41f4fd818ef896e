//! ReelRun Core Engine
//!
//! Turns a topic into a finished short-form vertical video.
//! Handles script and voice generation, visuals, word timing, captions,
//! composition, and the pipeline that ties them together.

pub mod cache;
pub mod captions;
pub mod ffmpeg;
pub mod fs;
pub mod generative;
pub mod pipeline;
pub mod script;
pub mod settings;
pub mod timing;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
