//! Generative Providers
//!
//! Adapters for the external steps of a reel run.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Generative Providers                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  providers.rs  - ScriptVoiceProvider / VisualProvider /          │
//! │                  ReelComposer traits and request types           │
//! │  narration.rs  - Script + voice from a TextGenerator and a       │
//! │                  SpeechSynthesizer                               │
//! │  gemini.rs     - Gemini text generation                          │
//! │  edge_tts.rs   - edge-tts voice synthesis                        │
//! │  openrouter.rs - OpenRouter image generation → video             │
//! │  composer.rs   - FFmpeg placeholder and final composition        │
//! │  mock.rs       - Deterministic in-process doubles                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod composer;
mod edge_tts;
mod gemini;
pub mod mock;
mod narration;
mod openrouter;
mod providers;

pub use composer::{static_caption_style, FfmpegComposer, PLACEHOLDER_RGB};
pub use edge_tts::{build_edge_tts_args, EdgeTtsVoice};
pub use gemini::GeminiScriptWriter;
pub use narration::{NarrationProvider, SpeechSynthesizer, TextGenerator};
pub use openrouter::{
    decode_base64_payload, extract_image_payload, resolve_image_model, ImagePayload,
    OpenRouterImageProvider, DEFAULT_IMAGE_MODEL,
};
pub use providers::{
    placeholder_path, CaptionPlan, CompositionRequest, ReelComposer, ScriptRequest,
    ScriptVoiceProvider, VisualProvider, VisualRequest,
};
