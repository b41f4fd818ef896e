//! Caption Word Classifier
//!
//! Assigns a [`ColorTag`] to each spoken word. Rules are checked in order and
//! the first match wins:
//!
//! 1. the word contains a decimal digit → `number`
//! 2. the word (edge punctuation stripped) is in the warning set → `warning`
//! 3. the word is in the highlight set → `highlight`
//! 4. otherwise → `default`
//!
//! Matching is case-insensitive.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::{ColorTag, WordTiming};

const DEFAULT_WARNING_WORDS: &[&str] = &[
    "danger", "death", "kill", "warning", "risk", "scary", "fear", "dead", "died", "disaster",
    "tragedy", "horror",
];

const DEFAULT_HIGHLIGHT_WORDS: &[&str] = &[
    "amazing",
    "incredible",
    "shocking",
    "wow",
    "unbelievable",
    "mind-blowing",
    "crazy",
    "insane",
];

/// Word sets used by the classifier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionWordLists {
    #[serde(default)]
    pub warning: Vec<String>,
    #[serde(default)]
    pub highlight: Vec<String>,
}

impl Default for CaptionWordLists {
    fn default() -> Self {
        Self {
            warning: DEFAULT_WARNING_WORDS.iter().map(|w| w.to_string()).collect(),
            highlight: DEFAULT_HIGHLIGHT_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

/// Deterministic word → tag classifier
#[derive(Clone, Debug)]
pub struct CaptionClassifier {
    warning: HashSet<String>,
    highlight: HashSet<String>,
}

impl Default for CaptionClassifier {
    fn default() -> Self {
        Self::new(&CaptionWordLists::default())
    }
}

impl CaptionClassifier {
    /// Builds a classifier from injected word lists
    pub fn new(lists: &CaptionWordLists) -> Self {
        Self {
            warning: normalize_set(&lists.warning),
            highlight: normalize_set(&lists.highlight),
        }
    }

    /// Classifies a single word
    pub fn classify(&self, word: &str) -> ColorTag {
        if word.chars().any(|c| c.is_ascii_digit()) {
            return ColorTag::Number;
        }

        let key = normalize_word(word);
        if self.warning.contains(&key) {
            ColorTag::Warning
        } else if self.highlight.contains(&key) {
            ColorTag::Highlight
        } else {
            ColorTag::Default
        }
    }

    /// Sets `color_tag` on every entry of a timing table
    pub fn tag_all(&self, timings: &mut [WordTiming]) {
        for timing in timings {
            timing.color_tag = self.classify(&timing.word);
        }
    }
}

/// Lowercases and strips leading/trailing punctuation. Inner hyphens survive
/// so that "mind-blowing" still matches.
fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

fn normalize_set(words: &[String]) -> HashSet<String> {
    words
        .iter()
        .map(|w| normalize_word(w))
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_scenario_words() {
        let classifier = CaptionClassifier::default();
        assert_eq!(classifier.classify("Mars"), ColorTag::Default);
        assert_eq!(classifier.classify("two"), ColorTag::Default);
        assert_eq!(classifier.classify("15"), ColorTag::Number);
        assert_eq!(classifier.classify("Danger!"), ColorTag::Warning);
        assert_eq!(classifier.classify("\"WOW,\""), ColorTag::Highlight);
        assert_eq!(classifier.classify("Mind-Blowing."), ColorTag::Highlight);
    }

    #[test]
    fn test_digit_rule_wins_over_word_sets() {
        let lists = CaptionWordLists {
            warning: vec!["$100".to_string()],
            highlight: vec!["$100".to_string(), "100".to_string()],
        };
        let classifier = CaptionClassifier::new(&lists);
        assert_eq!(classifier.classify("$100"), ColorTag::Number);
    }

    #[test]
    fn test_warning_wins_over_highlight() {
        let lists = CaptionWordLists {
            warning: vec!["crazy".to_string()],
            highlight: vec!["crazy".to_string()],
        };
        let classifier = CaptionClassifier::new(&lists);
        assert_eq!(classifier.classify("crazy"), ColorTag::Warning);
    }

    #[test]
    fn test_injected_lists_replace_defaults() {
        let lists = CaptionWordLists {
            warning: vec!["Volcano".to_string()],
            highlight: vec![],
        };
        let classifier = CaptionClassifier::new(&lists);
        assert_eq!(classifier.classify("volcano..."), ColorTag::Warning);
        assert_eq!(classifier.classify("danger"), ColorTag::Default);
    }

    #[test]
    fn test_tag_all_sets_every_entry() {
        let mut timings: Vec<WordTiming> = ["Only", "3", "deadly", "risk"]
            .iter()
            .enumerate()
            .map(|(i, w)| WordTiming {
                word: w.to_string(),
                start_seconds: i as f64,
                end_seconds: i as f64 + 1.0,
                color_tag: ColorTag::Default,
            })
            .collect();

        CaptionClassifier::default().tag_all(&mut timings);

        let tags: Vec<ColorTag> = timings.iter().map(|t| t.color_tag).collect();
        assert_eq!(
            tags,
            vec![
                ColorTag::Default,
                ColorTag::Number,
                ColorTag::Default,
                ColorTag::Warning
            ]
        );
    }

    #[test]
    fn test_punctuation_only_word_is_default() {
        assert_eq!(CaptionClassifier::default().classify("..."), ColorTag::Default);
    }
}
