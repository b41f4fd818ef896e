//! Voice Selection
//!
//! Maps a narration tone to a synthesis voice with rate and pitch offsets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::Tone;

/// Synthesis parameters for one narration voice
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    /// Voice identifier understood by the speech engine
    pub voice: String,
    /// Speaking rate offset (e.g. "+15%")
    pub rate: String,
    /// Pitch offset (e.g. "+5Hz")
    pub pitch: String,
    /// Volume offset
    #[serde(default = "default_volume")]
    pub volume: String,
}

fn default_volume() -> String {
    "+0%".to_string()
}

impl VoiceProfile {
    pub fn new(voice: &str, rate: &str, pitch: &str) -> Self {
        Self {
            voice: voice.to_string(),
            rate: rate.to_string(),
            pitch: pitch.to_string(),
            volume: default_volume(),
        }
    }
}

/// Tone → voice table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMap {
    pub profiles: HashMap<Tone, VoiceProfile>,
    /// Used for tones missing from `profiles`
    pub fallback: VoiceProfile,
}

impl Default for VoiceMap {
    fn default() -> Self {
        let profiles = HashMap::from([
            (
                Tone::Humorous,
                VoiceProfile::new("en-US-GuyNeural", "+15%", "+5Hz"),
            ),
            (
                Tone::Serious,
                VoiceProfile::new("en-US-AndrewNeural", "+5%", "+0Hz"),
            ),
            (
                Tone::Inspiring,
                VoiceProfile::new("en-US-JennyNeural", "+10%", "+2Hz"),
            ),
            (
                Tone::Casual,
                VoiceProfile::new("en-US-ChristopherNeural", "+10%", "+2Hz"),
            ),
            (
                Tone::Energetic,
                VoiceProfile::new("en-US-EricNeural", "+20%", "+8Hz"),
            ),
        ]);

        Self {
            profiles,
            fallback: VoiceProfile::new("en-US-AndrewNeural", "+10%", "+2Hz"),
        }
    }
}

impl VoiceMap {
    /// Profile for a tone
    pub fn for_tone(&self, tone: Tone) -> &VoiceProfile {
        self.profiles.get(&tone).unwrap_or(&self.fallback)
    }

    /// Profile for a tone, with the voice replaced when `voice_override` is set.
    /// Rate and pitch still follow the tone.
    pub fn resolve(&self, tone: Tone, voice_override: Option<&str>) -> VoiceProfile {
        let mut profile = self.for_tone(tone).clone();
        if let Some(voice) = voice_override.map(str::trim).filter(|v| !v.is_empty()) {
            profile.voice = voice.to_string();
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voices_per_tone() {
        let map = VoiceMap::default();
        assert_eq!(map.for_tone(Tone::Humorous).voice, "en-US-GuyNeural");
        assert_eq!(map.for_tone(Tone::Humorous).rate, "+15%");
        assert_eq!(map.for_tone(Tone::Serious).pitch, "+0Hz");
        assert_eq!(map.for_tone(Tone::Energetic).rate, "+20%");
        assert_eq!(map.for_tone(Tone::Casual).voice, "en-US-ChristopherNeural");
        assert_eq!(map.for_tone(Tone::Inspiring).pitch, "+2Hz");
    }

    #[test]
    fn test_missing_tone_uses_fallback() {
        let mut map = VoiceMap::default();
        map.profiles.remove(&Tone::Casual);
        assert_eq!(map.for_tone(Tone::Casual).voice, "en-US-AndrewNeural");
    }

    #[test]
    fn test_resolve_with_override() {
        let map = VoiceMap::default();
        let profile = map.resolve(Tone::Energetic, Some("en-GB-RyanNeural"));
        assert_eq!(profile.voice, "en-GB-RyanNeural");
        assert_eq!(profile.rate, "+20%");

        let blank = map.resolve(Tone::Energetic, Some("  "));
        assert_eq!(blank.voice, "en-US-EricNeural");
    }

    #[test]
    fn test_voice_map_json_uses_tone_names() {
        let json = serde_json::to_value(VoiceMap::default()).unwrap();
        assert_eq!(json["profiles"]["humorous"]["voice"], "en-US-GuyNeural");
        let back: VoiceMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, VoiceMap::default());
    }
}
