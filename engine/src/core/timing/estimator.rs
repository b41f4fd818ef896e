//! Proportional Timing Estimator
//!
//! Spreads a known audio duration across the words of a script, weighting
//! each word by its character length plus a fixed overhead. This approximates
//! natural pacing without phoneme-level alignment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::WordAligner;
use crate::core::{ColorTag, CoreError, CoreResult, ScriptResult, TimeSec, WordTiming};

/// Trailing characters that mark a spoken pause
pub const PAUSE_PUNCTUATION: [char; 6] = [',', '.', '!', '?', ':', ';'];

/// Weighting constants for proportional estimation.
///
/// The default weight of a word is its character count plus
/// `char_overhead`. The other two fields are opt-in refinements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingWeights {
    /// Weight added to every word so one-letter words never collapse to zero
    pub char_overhead: f64,
    /// Count only letters and digits, so symbols and punctuation add no time
    pub spoken_chars_only: bool,
    /// Extra weight for a word ending in [`PAUSE_PUNCTUATION`]
    pub punctuation_pause: f64,
}

impl Default for TimingWeights {
    fn default() -> Self {
        Self {
            char_overhead: 2.0,
            spoken_chars_only: false,
            punctuation_pause: 0.0,
        }
    }
}

impl TimingWeights {
    /// Letters and digits only, with a pause after punctuation
    pub fn speech_paced() -> Self {
        Self {
            spoken_chars_only: true,
            punctuation_pause: 1.0,
            ..Default::default()
        }
    }

    fn normalized(self) -> Self {
        Self {
            spoken_chars_only: self.spoken_chars_only,
            char_overhead: if self.char_overhead.is_finite() && self.char_overhead > 0.0 {
                self.char_overhead
            } else {
                TimingWeights::default().char_overhead
            },
            punctuation_pause: if self.punctuation_pause.is_finite() {
                self.punctuation_pause.max(0.0)
            } else {
                0.0
            },
        }
    }
}

/// Character-weighted timing estimator.
///
/// Pure and deterministic: identical inputs always yield identical tables.
#[derive(Debug, Clone, Default)]
pub struct ProportionalTimingEstimator {
    weights: TimingWeights,
}

impl ProportionalTimingEstimator {
    /// Creates an estimator with default weights
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an estimator with custom weights
    pub fn with_weights(weights: TimingWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }

    /// Returns the active weights
    pub fn weights(&self) -> TimingWeights {
        self.weights
    }

    /// Computes one timing entry per whitespace-delimited word.
    ///
    /// The first word starts at `0.0` and the last ends exactly at
    /// `total_audio_seconds`. Color tags are left at [`ColorTag::Default`].
    pub fn estimate(
        &self,
        script_text: &str,
        total_audio_seconds: TimeSec,
    ) -> CoreResult<Vec<WordTiming>> {
        if !total_audio_seconds.is_finite() || total_audio_seconds <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "Audio duration must be positive, got {}",
                total_audio_seconds
            )));
        }

        let words: Vec<&str> = script_text.split_whitespace().collect();
        if words.is_empty() {
            return Err(CoreError::InvalidInput(
                "Script text cannot be empty".to_string(),
            ));
        }

        let weights: Vec<f64> = words.iter().map(|w| self.word_weight(w)).collect();
        let total_weight: f64 = weights.iter().sum();

        let mut timings = Vec::with_capacity(words.len());
        let mut cursor = 0.0;
        let last = words.len() - 1;

        for (index, (word, weight)) in words.iter().zip(&weights).enumerate() {
            let start = cursor;
            let end = if index == last {
                total_audio_seconds
            } else {
                (start + total_audio_seconds * weight / total_weight).min(total_audio_seconds)
            };

            timings.push(WordTiming {
                word: (*word).to_string(),
                start_seconds: start,
                end_seconds: end,
                color_tag: ColorTag::Default,
            });
            cursor = end;
        }

        Ok(timings)
    }

    fn word_weight(&self, word: &str) -> f64 {
        let length = if self.weights.spoken_chars_only {
            word.chars().filter(|c| c.is_alphanumeric()).count()
        } else {
            word.chars().count()
        };
        let pause = if word.ends_with(PAUSE_PUNCTUATION) {
            self.weights.punctuation_pause
        } else {
            0.0
        };
        length as f64 + self.weights.char_overhead + pause
    }
}

#[async_trait]
impl WordAligner for ProportionalTimingEstimator {
    fn name(&self) -> &str {
        "proportional"
    }

    async fn align(&self, script: &ScriptResult) -> CoreResult<Vec<WordTiming>> {
        self.estimate(&script.text, script.audio_duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timing::validate_timings;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_mars_scenario_spans_full_duration() {
        let estimator = ProportionalTimingEstimator::new();
        let timings = estimator.estimate("Mars has two tiny moons", 4.0).unwrap();

        assert_eq!(timings.len(), 5);
        assert_eq!(timings[0].word, "Mars");
        assert_eq!(timings[4].word, "moons");
        assert!(timings[0].start_seconds.abs() < EPS);
        assert!((timings[4].end_seconds - 4.0).abs() < EPS);
        assert!(validate_timings(&timings, 5, 4.0).is_ok());
    }

    #[test]
    fn test_boundaries_are_contiguous_and_non_decreasing() {
        let estimator = ProportionalTimingEstimator::new();
        let text = "Did you know, octopuses have three hearts... and blue blood!";
        let timings = estimator.estimate(text, 7.25).unwrap();

        for pair in timings.windows(2) {
            assert!(pair[1].start_seconds >= pair[0].start_seconds);
            assert!((pair[1].start_seconds - pair[0].end_seconds).abs() < EPS);
        }
        for t in &timings {
            assert!(t.duration() > 0.0);
        }
    }

    #[test]
    fn test_longer_words_get_more_time() {
        let estimator = ProportionalTimingEstimator::new();
        let timings = estimator.estimate("a extraordinary", 3.0).unwrap();
        assert!(timings[1].duration() > timings[0].duration());
        assert!(timings[0].duration() > 0.0);
    }

    #[test]
    fn test_default_weight_is_length_plus_overhead() {
        let timings = ProportionalTimingEstimator::new()
            .estimate("$100 abcd", 2.0)
            .unwrap();
        assert!((timings[0].duration() - 1.0).abs() < EPS);
        assert!((timings[1].duration() - 1.0).abs() < EPS);

        // "ab," = 3 + 2, "abcd" = 4 + 2
        let timings = ProportionalTimingEstimator::new()
            .estimate("ab, abcd", 11.0)
            .unwrap();
        assert!((timings[0].duration() - 5.0).abs() < EPS);
        assert!((timings[1].duration() - 6.0).abs() < EPS);
    }

    #[test]
    fn test_speech_paced_weights_skip_symbols_and_pause() {
        let paced = ProportionalTimingEstimator::with_weights(TimingWeights::speech_paced());

        let symbols = paced.estimate("$100 abcd", 2.0).unwrap();
        assert!(symbols[1].duration() > symbols[0].duration());

        let unpaused = ProportionalTimingEstimator::with_weights(TimingWeights {
            spoken_chars_only: true,
            ..Default::default()
        })
        .estimate("stop, go", 2.0)
        .unwrap();
        let paused = paced.estimate("stop, go", 2.0).unwrap();
        assert!(paused[0].duration() > unpaused[0].duration());

        let semicolon = paced.estimate("stop; go", 2.0).unwrap();
        assert!((semicolon[0].duration() - paused[0].duration()).abs() < EPS);
    }

    #[test]
    fn test_weights_deserialize_with_defaults() {
        let weights: TimingWeights = serde_json::from_str(r#"{"charOverhead": 3.0}"#).unwrap();
        assert_eq!(weights.char_overhead, 3.0);
        assert!(!weights.spoken_chars_only);
        assert_eq!(weights.punctuation_pause, 0.0);
    }

    #[test]
    fn test_single_word_spans_entire_duration() {
        let timings = ProportionalTimingEstimator::new()
            .estimate("Hello", 2.5)
            .unwrap();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].start_seconds, 0.0);
        assert_eq!(timings[0].end_seconds, 2.5);
    }

    #[test]
    fn test_invalid_inputs() {
        let estimator = ProportionalTimingEstimator::new();
        assert!(matches!(
            estimator.estimate("", 3.0),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            estimator.estimate("   \n\t", 3.0),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            estimator.estimate("hello", 0.0),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            estimator.estimate("hello", -1.0),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            estimator.estimate("hello", f64::NAN),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let estimator = ProportionalTimingEstimator::new();
        let text = "The Eiffel Tower grows 15 cm taller in summer.";
        assert_eq!(
            estimator.estimate(text, 5.0).unwrap(),
            estimator.estimate(text, 5.0).unwrap()
        );
    }

    #[test]
    fn test_punctuation_only_tokens_still_get_time() {
        let timings = ProportionalTimingEstimator::new()
            .estimate("wait ... what", 3.0)
            .unwrap();
        assert_eq!(timings.len(), 3);
        assert!(timings[1].duration() > 0.0);
    }

    #[test]
    fn test_invalid_weights_are_normalized() {
        let estimator = ProportionalTimingEstimator::with_weights(TimingWeights {
            char_overhead: -4.0,
            spoken_chars_only: true,
            punctuation_pause: f64::NAN,
        });
        assert_eq!(estimator.weights().char_overhead, 2.0);
        assert_eq!(estimator.weights().punctuation_pause, 0.0);
    }

    #[tokio::test]
    async fn test_align_uses_script_duration() {
        let script = ScriptResult {
            text: "Mars has two tiny moons".to_string(),
            audio_duration_seconds: 4.0,
            voice_identifier: "voice".to_string(),
            audio_path: "voice.mp3".into(),
            visual_prompt: None,
        };
        let timings = ProportionalTimingEstimator::new()
            .align(&script)
            .await
            .unwrap();
        assert_eq!(timings.len(), 5);
        assert_eq!(timings[4].end_seconds, 4.0);
    }
}
