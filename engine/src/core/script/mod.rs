//! Script Module
//!
//! Text-side helpers for the script and voice stage: prompt construction,
//! cleanup of model output, TTS normalization and the tone → voice table.

mod humanize;
mod prompt;
mod voice;

pub use humanize::{strip_markdown_fences, TtsNormalizer};
pub use prompt::{
    build_script_prompt, build_visual_prompt, enhance_visual_prompt, fallback_visual_prompt,
    word_budget, RANDOM_TOPIC_INSTRUCTION, WORDS_PER_SECOND,
};
pub use voice::{VoiceMap, VoiceProfile};
