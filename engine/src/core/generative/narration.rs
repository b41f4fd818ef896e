//! Narration Provider
//!
//! Script + voice step built from two smaller collaborators: a text
//! generator (script and visual description) and a speech synthesizer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::providers::{ScriptRequest, ScriptVoiceProvider};
use crate::core::ffmpeg::FFmpegRunner;
use crate::core::script::{
    build_script_prompt, build_visual_prompt, fallback_visual_prompt, strip_markdown_fences,
    word_budget, TtsNormalizer, VoiceProfile,
};
use crate::core::{CoreError, CoreResult, ScriptResult, TimeSec};

/// Large language model used for script and visual description
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the model's plain-text answer to `prompt`
    async fn generate_text(&self, prompt: &str) -> CoreResult<String>;
}

/// Text-to-speech engine
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Writes spoken `text` to `output`
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> CoreResult<()>;
}

/// [`ScriptVoiceProvider`] that writes, normalizes and voices a script
pub struct NarrationProvider {
    writer: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    normalizer: TtsNormalizer,
    duration_probe: Option<FFmpegRunner>,
}

impl NarrationProvider {
    pub fn new(
        writer: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> CoreResult<Self> {
        Ok(Self {
            writer,
            synthesizer,
            normalizer: TtsNormalizer::new()?,
            duration_probe: None,
        })
    }

    /// Measures voiceover length with ffprobe instead of using the target
    pub fn with_duration_probe(mut self, runner: FFmpegRunner) -> Self {
        self.duration_probe = Some(runner);
        self
    }

    async fn derive_visual_prompt(&self, script: &str, request: &ScriptRequest) -> String {
        match self
            .writer
            .generate_text(&build_visual_prompt(script, request.tone))
            .await
        {
            Ok(answer) => {
                let prompt = strip_markdown_fences(&answer);
                if prompt.is_empty() {
                    warn!("Empty visual description, using generic prompt");
                    fallback_visual_prompt(request.tone)
                } else {
                    prompt
                }
            }
            Err(e) => {
                warn!("Visual description failed, using generic prompt: {}", e);
                fallback_visual_prompt(request.tone)
            }
        }
    }

    async fn measure_duration(&self, audio_path: &Path, target_seconds: u32) -> TimeSec {
        if let Some(runner) = &self.duration_probe {
            match runner.probe_duration(audio_path).await {
                Ok(duration) => return duration,
                Err(e) => warn!(
                    "Could not measure voiceover, assuming {}s: {}",
                    target_seconds, e
                ),
            }
        }
        target_seconds as TimeSec
    }
}

#[async_trait]
impl ScriptVoiceProvider for NarrationProvider {
    fn name(&self) -> &str {
        "narration"
    }

    async fn generate_script_and_voice(
        &self,
        request: &ScriptRequest,
        audio_dir: &Path,
    ) -> CoreResult<ScriptResult> {
        let prompt = build_script_prompt(&request.topic, request.tone, request.duration_seconds);
        let raw = self.writer.generate_text(&prompt).await?;

        let text = self.normalizer.humanize(&strip_markdown_fences(&raw));
        if text.is_empty() {
            return Err(CoreError::GenerationFailed(format!(
                "{} returned an empty script",
                self.writer.name()
            )));
        }

        let words = text.split_whitespace().count();
        let budget = word_budget(request.duration_seconds) as usize;
        if words > budget {
            debug!("Script has {} words, budget was {}", words, budget);
        }
        info!("Script generated ({} words)", words);

        let visual_prompt = self.derive_visual_prompt(&text, request).await;

        tokio::fs::create_dir_all(audio_dir).await?;
        let audio_path = audio_dir.join("voice.mp3");
        self.synthesizer
            .synthesize(&text, &request.voice, &audio_path)
            .await?;
        info!(
            "Voiceover generated with {}: {}",
            request.voice.voice,
            audio_path.display()
        );

        let audio_duration_seconds = self
            .measure_duration(&audio_path, request.duration_seconds)
            .await;

        let result = ScriptResult {
            text,
            audio_duration_seconds,
            voice_identifier: request.voice.voice.clone(),
            audio_path,
            visual_prompt: Some(visual_prompt),
        };
        result
            .validate()
            .map_err(|e| CoreError::GenerationFailed(e.to_string()))?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::VoiceMap;
    use crate::core::Tone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct ScriptedWriter {
        script: String,
        visual: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for ScriptedWriter {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_text(&self, prompt: &str) -> CoreResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.starts_with("Based on this script") {
                self.visual
                    .clone()
                    .ok_or_else(|| CoreError::GenerationFailed("quota".to_string()))
            } else {
                Ok(self.script.clone())
            }
        }
    }

    struct FileSynth;

    #[async_trait]
    impl SpeechSynthesizer for FileSynth {
        fn name(&self) -> &str {
            "file"
        }

        async fn synthesize(
            &self,
            text: &str,
            _voice: &VoiceProfile,
            output: &Path,
        ) -> CoreResult<()> {
            tokio::fs::write(output, text.as_bytes()).await?;
            Ok(())
        }
    }

    fn request(tone: Tone) -> ScriptRequest {
        ScriptRequest {
            topic: "Mars".to_string(),
            tone,
            duration_seconds: 12,
            voice: VoiceMap::default().for_tone(tone).clone(),
        }
    }

    #[tokio::test]
    async fn test_generates_normalized_script_and_voice() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter {
            script: "```\nMars has two tiny moons; Phobos and Deimos.\n```".to_string(),
            visual: Some("A red planet rising over dunes".to_string()),
            calls: AtomicUsize::new(0),
        });
        let provider = NarrationProvider::new(writer.clone(), Arc::new(FileSynth)).unwrap();

        let result = provider
            .generate_script_and_voice(&request(Tone::Serious), dir.path())
            .await
            .unwrap();

        assert_eq!(result.text, "Mars has two tiny moons, Phobos and Deimos.");
        assert_eq!(result.voice_identifier, "en-US-AndrewNeural");
        assert_eq!(result.audio_duration_seconds, 12.0);
        assert_eq!(
            result.visual_prompt.as_deref(),
            Some("A red planet rising over dunes")
        );
        assert!(result.audio_path.exists());
        assert_eq!(writer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_visual_description_failure_uses_generic_prompt() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter {
            script: "Short fact.".to_string(),
            visual: None,
            calls: AtomicUsize::new(0),
        });
        let provider = NarrationProvider::new(writer, Arc::new(FileSynth)).unwrap();

        let result = provider
            .generate_script_and_voice(&request(Tone::Casual), dir.path())
            .await
            .unwrap();

        assert_eq!(
            result.visual_prompt.as_deref(),
            Some("Cinematic casual visuals with dynamic movement and engaging composition")
        );
    }

    #[tokio::test]
    async fn test_empty_script_is_generation_failure() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(ScriptedWriter {
            script: "```\n```".to_string(),
            visual: None,
            calls: AtomicUsize::new(0),
        });
        let provider = NarrationProvider::new(writer, Arc::new(FileSynth)).unwrap();

        let err = provider
            .generate_script_and_voice(&request(Tone::Humorous), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::GenerationFailed(_)));
    }
}
