//! Edge TTS Voice
//!
//! Drives the `edge-tts` command line tool to synthesize voiceovers.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

use super::narration::SpeechSynthesizer;
use crate::core::script::VoiceProfile;
use crate::core::{CoreError, CoreResult};

/// `edge-tts` subprocess synthesizer
#[derive(Debug, Clone)]
pub struct EdgeTtsVoice {
    binary: PathBuf,
}

impl Default for EdgeTtsVoice {
    fn default() -> Self {
        Self::new("edge-tts")
    }
}

impl EdgeTtsVoice {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

/// Builds the `edge-tts` argument list.
///
/// Prosody values are passed with `=` so negative rates are not parsed as
/// flags.
pub fn build_edge_tts_args(voice: &VoiceProfile, text_file: &Path, output: &Path) -> Vec<String> {
    vec![
        "--voice".to_string(),
        voice.voice.clone(),
        format!("--rate={}", voice.rate),
        format!("--pitch={}", voice.pitch),
        format!("--volume={}", voice.volume),
        "--file".to_string(),
        text_file.to_string_lossy().to_string(),
        "--write-media".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsVoice {
    fn name(&self) -> &str {
        "edge-tts"
    }

    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> CoreResult<()> {
        if text.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Cannot synthesize empty text".to_string(),
            ));
        }

        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        // Long scripts go through a file to stay clear of argv limits.
        let text_file = parent.join("script.txt");
        tokio::fs::write(&text_file, text.as_bytes()).await?;

        let args = build_edge_tts_args(voice, &text_file, output);
        debug!("{} {}", self.binary.display(), args.join(" "));

        let result = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CoreError::GenerationFailed(format!(
                    "Failed to launch {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CoreError::GenerationFailed(format!(
                "edge-tts exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(CoreError::GenerationFailed(format!(
                "edge-tts produced no audio at {}",
                output.display()
            )));
        }

        Ok(())
    }
}
