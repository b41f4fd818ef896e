//! Prompt Construction
//!
//! Builds the text prompts sent to the script writer and image model.

use crate::core::Tone;

/// Average narration pace used to size scripts
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Instruction used in place of a concrete topic for `"random"`
pub const RANDOM_TOPIC_INSTRUCTION: &str =
    "Choose a fascinating, funny, or mind-blowing event/fact from India";

/// Maximum script length in words for a target duration
pub fn word_budget(duration_seconds: u32) -> u32 {
    (duration_seconds as f64 * WORDS_PER_SECOND).floor() as u32
}

/// Prompt for the narration script
pub fn build_script_prompt(topic: &str, tone: Tone, duration_seconds: u32) -> String {
    let topic_instruction = if topic.trim().eq_ignore_ascii_case(crate::core::RANDOM_TOPIC) {
        RANDOM_TOPIC_INSTRUCTION.to_string()
    } else {
        format!("Write about: {}", topic.trim())
    };
    let max_words = word_budget(duration_seconds);

    format!(
        "Write a viral {duration_seconds}-second Instagram reel narration.\n\
         \n\
         Topic:\n\
         {topic_instruction}\n\
         \n\
         Tone: {tone}\n\
         \n\
         Requirements:\n\
         - Start with a shocking or attention-grabbing 1-sentence hook\n\
         - Must be TRUE and verifiable (no fictional stories)\n\
         - Mix {tone} tone with curiosity and engagement\n\
         - Maximum {max_words} words\n\
         - End with a strong call-to-action or thought-provoking statement\n\
         - Use conversational spoken English\n\
         - Natural pauses using commas and ellipses\n\
         - Short sentences for easy captioning\n\
         - NO markdown, NO formatting, plain text only\n\
         - Make it shareable and memorable\n\
         \n\
         Format: Just the narration script, nothing else.\n"
    )
}

/// Prompt asking for a one-sentence background visual description
pub fn build_visual_prompt(script: &str, tone: Tone) -> String {
    format!(
        "Based on this script, create a short visual description for a background video:\n\
         \n\
         Script: {script}\n\
         \n\
         Generate a 1-sentence description of what visuals would complement this narration.\n\
         Focus on: mood, setting, movement, colors.\n\
         Style: {tone}, engaging, professional.\n\
         Format: Just the description, nothing else.\n"
    )
}

/// Generic visual description used when none can be derived
pub fn fallback_visual_prompt(tone: Tone) -> String {
    format!("Cinematic {tone} visuals with dynamic movement and engaging composition")
}

/// Adds style and framing hints for the image model
pub fn enhance_visual_prompt(prompt: &str, style: &str) -> String {
    format!(
        "{}. Style: {}, professional quality, vertical 9:16 composition",
        prompt.trim().trim_end_matches('.'),
        style.trim()
    )
}
