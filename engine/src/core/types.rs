//! ReelRun Core Type Definitions
//!
//! Defines the data model shared by every pipeline stage.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CoreError, CoreResult};

// =============================================================================
// ID Types
// =============================================================================

/// Pipeline run unique identifier (ULID)
pub type RunId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

// =============================================================================
// Tone
// =============================================================================

/// Narration tone requested for a reel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Humorous,
    Serious,
    Inspiring,
    Casual,
    Energetic,
}

impl Tone {
    /// All tones, in declaration order
    pub const ALL: [Tone; 5] = [
        Tone::Humorous,
        Tone::Serious,
        Tone::Inspiring,
        Tone::Casual,
        Tone::Energetic,
    ];

    /// Returns the lowercase name used in prompts and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Humorous => "humorous",
            Tone::Serious => "serious",
            Tone::Inspiring => "inspiring",
            Tone::Casual => "casual",
            Tone::Energetic => "energetic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "humorous" => Ok(Tone::Humorous),
            "serious" => Ok(Tone::Serious),
            "inspiring" => Ok(Tone::Inspiring),
            "casual" => Ok(Tone::Casual),
            "energetic" => Ok(Tone::Energetic),
            other => Err(CoreError::InvalidInput(format!("Unknown tone: {}", other))),
        }
    }
}

// =============================================================================
// Reel Configuration
// =============================================================================

/// Topic value that lets the script writer pick its own subject
pub const RANDOM_TOPIC: &str = "random";

/// Request for one reel. Immutable once a pipeline run starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReelConfig {
    /// Subject of the reel, or `"random"`
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Narration tone
    #[serde(default)]
    pub tone: Tone,
    /// Target duration in seconds
    #[serde(default = "default_duration", alias = "duration")]
    pub duration_seconds: u32,
    /// Visual style keyword (e.g. "cinematic")
    #[serde(default = "default_visual_style", alias = "video_style")]
    pub visual_style: String,
    /// Visual model alias (e.g. "flux")
    #[serde(default = "default_visual_model", alias = "video_model")]
    pub visual_model: String,
    /// File name of the composed output
    #[serde(default = "default_output_name")]
    pub output_name: String,
    /// Explicit visual prompt; derived from the script when absent
    #[serde(default, alias = "video_prompt", skip_serializing_if = "Option::is_none")]
    pub visual_prompt: Option<String>,
    /// Explicit voice; chosen from the tone when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

fn default_topic() -> String {
    RANDOM_TOPIC.to_string()
}

fn default_duration() -> u32 {
    30
}

fn default_visual_style() -> String {
    "cinematic".to_string()
}

fn default_visual_model() -> String {
    "flux".to_string()
}

fn default_output_name() -> String {
    "final_reel.mp4".to_string()
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            tone: Tone::default(),
            duration_seconds: default_duration(),
            visual_style: default_visual_style(),
            visual_model: default_visual_model(),
            output_name: default_output_name(),
            visual_prompt: None,
            voice: None,
        }
    }
}

impl ReelConfig {
    /// Creates a config for a topic with default settings
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Sets the tone
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// Sets the target duration
    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Sets the visual style
    pub fn with_visual_style(mut self, style: impl Into<String>) -> Self {
        self.visual_style = style.into();
        self
    }

    /// Sets the visual model alias
    pub fn with_visual_model(mut self, model: impl Into<String>) -> Self {
        self.visual_model = model.into();
        self
    }

    /// Sets the output file name
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Overrides the derived visual prompt
    pub fn with_visual_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.visual_prompt = Some(prompt.into());
        self
    }

    /// Returns true when the script writer should choose the subject
    pub fn is_random_topic(&self) -> bool {
        self.topic.trim().eq_ignore_ascii_case(RANDOM_TOPIC)
    }

    /// Validates the configuration before a run starts
    pub fn validate(&self) -> CoreResult<()> {
        if self.topic.trim().is_empty() {
            return Err(CoreError::InvalidInput("Topic cannot be empty".to_string()));
        }
        if self.duration_seconds == 0 {
            return Err(CoreError::InvalidInput(
                "Duration must be greater than zero".to_string(),
            ));
        }
        if self.visual_style.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Visual style cannot be empty".to_string(),
            ));
        }
        if self.visual_model.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Visual model cannot be empty".to_string(),
            ));
        }
        crate::core::fs::validate_output_name(&self.output_name)
            .map_err(CoreError::InvalidInput)?;
        Ok(())
    }
}

// =============================================================================
// Stage Values
// =============================================================================

/// Output of the script and voice stage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResult {
    /// Narration text (non-empty)
    pub text: String,
    /// Measured length of the voiceover
    pub audio_duration_seconds: TimeSec,
    /// Voice used for synthesis
    pub voice_identifier: String,
    /// Voiceover audio file
    pub audio_path: PathBuf,
    /// Visual description derived from the script, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_prompt: Option<String>,
}

impl ScriptResult {
    /// Checks the invariants every downstream stage relies on
    pub fn validate(&self) -> CoreResult<()> {
        if self.text.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Script text cannot be empty".to_string(),
            ));
        }
        if !self.audio_duration_seconds.is_finite() || self.audio_duration_seconds <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "Audio duration must be positive, got {}",
                self.audio_duration_seconds
            )));
        }
        Ok(())
    }

    /// Number of whitespace-delimited words in the script
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Semantic color class of a caption word
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Number,
    Warning,
    Highlight,
    #[default]
    Default,
}

/// Timing and color of one spoken word
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    pub word: String,
    pub start_seconds: TimeSec,
    pub end_seconds: TimeSec,
    pub color_tag: ColorTag,
}

impl WordTiming {
    /// Time the word stays on screen
    pub fn duration(&self) -> TimeSec {
        self.end_seconds - self.start_seconds
    }
}

/// Where a visual asset came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualSource {
    Generated,
    Fallback,
}

/// Background visual for a reel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualAsset {
    pub path: PathBuf,
    pub source: VisualSource,
    pub duration_seconds: TimeSec,
}

impl VisualAsset {
    /// Creates an asset produced by a generation provider
    pub fn generated(path: impl Into<PathBuf>, duration_seconds: TimeSec) -> Self {
        Self {
            path: path.into(),
            source: VisualSource::Generated,
            duration_seconds,
        }
    }

    /// Creates a placeholder asset
    pub fn fallback(path: impl Into<PathBuf>, duration_seconds: TimeSec) -> Self {
        Self {
            path: path.into(),
            source: VisualSource::Fallback,
            duration_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Tone Tests
    // ========================================================================

    #[test]
    fn test_tone_round_trip_names() {
        for tone in Tone::ALL {
            assert_eq!(tone.as_str().parse::<Tone>().unwrap(), tone);
        }
        assert_eq!("  Serious ".parse::<Tone>().unwrap(), Tone::Serious);
    }

    #[test]
    fn test_tone_unknown_is_invalid_input() {
        let err = "sarcastic".parse::<Tone>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    // ========================================================================
    // ReelConfig Tests
    // ========================================================================

    #[test]
    fn test_config_defaults() {
        let config = ReelConfig::default();
        assert_eq!(config.topic, "random");
        assert_eq!(config.tone, Tone::Humorous);
        assert_eq!(config.duration_seconds, 30);
        assert_eq!(config.visual_style, "cinematic");
        assert_eq!(config.visual_model, "flux");
        assert_eq!(config.output_name, "final_reel.mp4");
        assert!(config.is_random_topic());
    }

    #[test]
    fn test_config_accepts_legacy_keys() {
        let json = r#"{
            "topic": "space",
            "tone": "serious",
            "duration": 10,
            "video_style": "anime",
            "video_model": "sdxl",
            "output_name": "space.mp4"
        }"#;
        let config: ReelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.duration_seconds, 10);
        assert_eq!(config.visual_style, "anime");
        assert_eq!(config.visual_model, "sdxl");
        assert!(!config.is_random_topic());
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let result = serde_json::from_str::<ReelConfig>(r#"{"topic": "space", "tone_": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(ReelConfig::new("space").validate().is_ok());
        assert!(ReelConfig::new("  ").validate().is_err());
        assert!(ReelConfig::new("space").with_duration(0).validate().is_err());
        assert!(ReelConfig::new("space")
            .with_output_name("../escape.mp4")
            .validate()
            .is_err());
    }

    // ========================================================================
    // ScriptResult Tests
    // ========================================================================

    #[test]
    fn test_script_result_validation() {
        let mut script = ScriptResult {
            text: "Mars has two tiny moons".to_string(),
            audio_duration_seconds: 4.0,
            voice_identifier: "en-US-AndrewNeural".to_string(),
            audio_path: PathBuf::from("voice.mp3"),
            visual_prompt: None,
        };
        assert!(script.validate().is_ok());
        assert_eq!(script.word_count(), 5);

        script.audio_duration_seconds = 0.0;
        assert!(script.validate().is_err());

        script.audio_duration_seconds = 4.0;
        script.text = " ".to_string();
        assert!(script.validate().is_err());
    }

    #[test]
    fn test_color_tag_serialization() {
        assert_eq!(
            serde_json::to_string(&ColorTag::Highlight).unwrap(),
            "\"highlight\""
        );
        assert_eq!(ColorTag::default(), ColorTag::Default);
    }
}
