//! TTS Text Normalization
//!
//! Rewrites model output so the speech engine pauses naturally.

use regex::Regex;

use crate::core::{CoreError, CoreResult};

/// A first sentence in this word range reads as a hook and gets a pause.
const HOOK_WORDS_MIN: usize = 5;
const HOOK_WORDS_MAX: usize = 14;

/// Normalizes script text before synthesis.
///
/// Holds precompiled patterns; build once and reuse across runs.
#[derive(Debug, Clone)]
pub struct TtsNormalizer {
    whitespace: Regex,
    repeated_commas: Regex,
    long_ellipsis: Regex,
}

impl TtsNormalizer {
    pub fn new() -> CoreResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| CoreError::Internal(format!("Invalid pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            whitespace: compile(r"\s+")?,
            repeated_commas: compile(r",(\s*,)+\s*")?,
            long_ellipsis: compile(r"\.{4,}")?,
        })
    }

    /// Applies, in order:
    /// - whitespace collapse and trim
    /// - `;` and `:` → `,`, spaced dashes → `, `, parentheses → comma clause
    /// - duplicate commas collapsed, 4+ dots → `...`
    /// - `...` after a 5-14 word opening sentence
    pub fn humanize(&self, text: &str) -> String {
        let mut cleaned = self.whitespace.replace_all(text, " ").trim().to_string();

        cleaned = cleaned
            .replace(';', ",")
            .replace(':', ",")
            .replace(" - ", ", ")
            .replace(" -- ", ", ")
            .replace('(', ", ")
            .replace(')', "");

        cleaned = self
            .repeated_commas
            .replace_all(&cleaned, ", ")
            .into_owned();
        cleaned = self.long_ellipsis.replace_all(&cleaned, "...").into_owned();

        if let Some((first, rest)) = cleaned.split_once('.') {
            let hook_words = first.split_whitespace().count();
            // Only a hook followed by more narration gets the pause, and not
            // when the sentence already ends in an ellipsis.
            if (HOOK_WORDS_MIN..=HOOK_WORDS_MAX).contains(&hook_words)
                && !rest.starts_with('.')
                && !rest.trim().is_empty()
            {
                cleaned = format!("{}... {}", first, rest.trim());
            }
        }

        cleaned
    }
}

/// Removes a surrounding Markdown code fence, if any.
///
/// A bare language tag on the opening fence line (e.g. "text") is dropped.
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let Some(inner) = trimmed.split("```").nth(1) else {
        return trimmed.to_string();
    };

    let inner = match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains(char::is_whitespace) => body,
        _ => inner,
    };
    inner.trim().to_string()
}
