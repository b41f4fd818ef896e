//! Mock Collaborators
//!
//! In-process doubles for the pipeline traits. They write small placeholder
//! files, count calls and can be told to fail or stall.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::providers::{
    placeholder_path, CaptionPlan, CompositionRequest, ReelComposer, ScriptRequest,
    ScriptVoiceProvider, VisualProvider, VisualRequest,
};
use crate::core::{CoreError, CoreResult, ScriptResult, TimeSec, VisualAsset};

async fn write_stub(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

async fn maybe_stall(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// Script + Voice
// =============================================================================

/// Mock script/voice provider
#[derive(Debug, Clone)]
pub struct MockScriptVoiceProvider {
    text: String,
    audio_duration_seconds: TimeSec,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockScriptVoiceProvider {
    /// Creates a provider that always returns `text` with the given duration
    pub fn new(text: impl Into<String>, audio_duration_seconds: TimeSec) -> Self {
        Self {
            text: text.into(),
            audio_duration_seconds,
            failure: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes every call fail with a generation error
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Delays every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptVoiceProvider for MockScriptVoiceProvider {
    fn name(&self) -> &str {
        "mock-script"
    }

    async fn generate_script_and_voice(
        &self,
        request: &ScriptRequest,
        audio_dir: &Path,
    ) -> CoreResult<ScriptResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        maybe_stall(self.delay).await;

        if let Some(message) = &self.failure {
            return Err(CoreError::GenerationFailed(message.clone()));
        }

        let audio_path = audio_dir.join("voice.mp3");
        write_stub(&audio_path, b"mock-audio").await?;

        Ok(ScriptResult {
            text: self.text.clone(),
            audio_duration_seconds: self.audio_duration_seconds,
            voice_identifier: request.voice.voice.clone(),
            audio_path,
            visual_prompt: Some(format!("Visuals for {}", request.topic)),
        })
    }
}

// =============================================================================
// Visual
// =============================================================================

/// Mock visual provider
#[derive(Debug, Clone)]
pub struct MockVisualProvider {
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<VisualRequest>>>,
}

impl Default for MockVisualProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVisualProvider {
    pub fn new() -> Self {
        Self {
            failure: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes every call fail with a generation error
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Delays every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order
    pub async fn requests(&self) -> Vec<VisualRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl VisualProvider for MockVisualProvider {
    fn name(&self) -> &str {
        "mock-visual"
    }

    async fn generate_visual(
        &self,
        request: &VisualRequest,
        duration_seconds: TimeSec,
        out_dir: &Path,
    ) -> CoreResult<VisualAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        maybe_stall(self.delay).await;

        if let Some(message) = &self.failure {
            return Err(CoreError::GenerationFailed(message.clone()));
        }

        let path = out_dir.join("generated.mp4");
        write_stub(&path, b"mock-visual").await?;
        Ok(VisualAsset::generated(path, duration_seconds))
    }
}

// =============================================================================
// Composer
// =============================================================================

/// Mock composer
#[derive(Debug, Clone, Default)]
pub struct MockReelComposer {
    fail_animated_captions: bool,
    fail_compose: bool,
    fail_placeholder: bool,
    compose_calls: Arc<AtomicUsize>,
    placeholder_calls: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<(VisualAsset, CaptionPlan)>>>,
}

impl MockReelComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects animated captions with a caption-timing error
    pub fn with_failing_animated_captions(mut self) -> Self {
        self.fail_animated_captions = true;
        self
    }

    /// Fails every composition outright
    pub fn with_failing_compose(mut self) -> Self {
        self.fail_compose = true;
        self
    }

    /// Fails placeholder rendering
    pub fn with_failing_placeholder(mut self) -> Self {
        self.fail_placeholder = true;
        self
    }

    /// Number of `compose_output` calls so far
    pub fn compose_calls(&self) -> usize {
        self.compose_calls.load(Ordering::SeqCst)
    }

    /// Number of `render_placeholder` calls so far
    pub fn placeholder_calls(&self) -> usize {
        self.placeholder_calls.load(Ordering::SeqCst)
    }

    /// Visual and caption plan of every composition attempt, in order
    pub async fn received(&self) -> Vec<(VisualAsset, CaptionPlan)> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl ReelComposer for MockReelComposer {
    fn name(&self) -> &str {
        "mock-composer"
    }

    async fn compose_output(&self, request: &CompositionRequest<'_>) -> CoreResult<()> {
        self.compose_calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .await
            .push((request.visual.clone(), request.captions.clone()));

        if self.fail_compose {
            return Err(CoreError::CompositionFailed("mock encoder crashed".to_string()));
        }
        if self.fail_animated_captions && !request.captions.is_static() {
            return Err(CoreError::CaptionTimingFailed(
                "mock caption renderer rejected timings".to_string(),
            ));
        }

        write_stub(request.output_path, b"mock-reel").await
    }

    async fn render_placeholder(
        &self,
        duration_seconds: TimeSec,
        out_dir: &Path,
    ) -> CoreResult<VisualAsset> {
        self.placeholder_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_placeholder {
            return Err(CoreError::CompositionFailed(
                "mock placeholder failed".to_string(),
            ));
        }

        let path = placeholder_path(out_dir);
        write_stub(&path, b"mock-placeholder").await?;
        Ok(VisualAsset::fallback(path, duration_seconds))
    }
}
