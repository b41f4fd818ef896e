//! Pipeline Collaborators
//!
//! Narrow async interfaces for the three external steps of a run. The
//! orchestrator only talks to these traits; concrete adapters live in
//! sibling modules and test doubles in `mock`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::script::VoiceProfile;
use crate::core::{CoreError, CoreResult, ScriptResult, TimeSec, Tone, VisualAsset, WordTiming};

// =============================================================================
// Requests
// =============================================================================

/// Input of the script and voice step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest {
    pub topic: String,
    pub tone: Tone,
    pub duration_seconds: u32,
    pub voice: VoiceProfile,
}

/// Input of the visual step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualRequest {
    pub prompt: String,
    pub style: String,
    pub model: String,
}

/// How captions are rendered during composition
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionPlan {
    /// One animated word at a time, from a tagged timing table
    Animated(Vec<WordTiming>),
    /// Unanimated phrases spread evenly over the voiceover
    Static,
}

impl CaptionPlan {
    pub fn is_static(&self) -> bool {
        matches!(self, CaptionPlan::Static)
    }
}

/// Input of the composition step
#[derive(Debug, Clone)]
pub struct CompositionRequest<'a> {
    pub script: &'a ScriptResult,
    pub visual: &'a VisualAsset,
    pub captions: &'a CaptionPlan,
    /// Directory for intermediate caption documents
    pub work_dir: &'a Path,
    pub output_path: &'a Path,
}

// =============================================================================
// Traits
// =============================================================================

/// Writes the narration and synthesizes the voiceover
#[async_trait]
pub trait ScriptVoiceProvider: Send + Sync {
    /// Returns the provider name (for logging)
    fn name(&self) -> &str;

    /// Produces a script and its voiceover under `audio_dir`
    async fn generate_script_and_voice(
        &self,
        request: &ScriptRequest,
        audio_dir: &Path,
    ) -> CoreResult<ScriptResult>;
}

/// Produces the background visual
#[async_trait]
pub trait VisualProvider: Send + Sync {
    /// Returns the provider name (for logging)
    fn name(&self) -> &str;

    /// Generates a visual lasting at least `duration_seconds` under `out_dir`
    async fn generate_visual(
        &self,
        request: &VisualRequest,
        duration_seconds: TimeSec,
        out_dir: &Path,
    ) -> CoreResult<VisualAsset>;
}

/// Renders media: placeholder visuals and the final reel
#[async_trait]
pub trait ReelComposer: Send + Sync {
    /// Returns the composer name (for logging)
    fn name(&self) -> &str;

    /// Muxes visual, voiceover and captions into `request.output_path`.
    ///
    /// Returns [`CoreError::CaptionTimingFailed`] when only the caption
    /// sub-step is at fault, so the caller can retry with static captions.
    async fn compose_output(&self, request: &CompositionRequest<'_>) -> CoreResult<()>;

    /// Writes a solid-color placeholder of `duration_seconds`
    async fn render_placeholder(
        &self,
        _duration_seconds: TimeSec,
        _out_dir: &Path,
    ) -> CoreResult<VisualAsset> {
        Err(CoreError::NotSupported(format!(
            "{} does not render placeholder visuals",
            self.name()
        )))
    }
}

/// File name used for placeholder visuals
pub fn placeholder_path(out_dir: &Path) -> PathBuf {
    out_dir.join("fallback.mp4")
}
