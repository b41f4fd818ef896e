//! Pipeline Orchestrator
//!
//! Sequences script+voice → visual → timing → composition for one reel,
//! routing stage failures through the [`FallbackPolicy`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cancel::CancellationToken;
use super::fallback::{FallbackDecision, FallbackPolicy};
use super::stage::{StageId, StageRecord, StageResult, StageStatus};
use crate::core::cache::VisualCache;
use crate::core::captions::CaptionClassifier;
use crate::core::fs::{promote_file, RunWorkspace};
use crate::core::generative::{
    CaptionPlan, CompositionRequest, ReelComposer, ScriptRequest, ScriptVoiceProvider,
    VisualProvider, VisualRequest,
};
use crate::core::script::{fallback_visual_prompt, VoiceMap};
use crate::core::timing::{
    validate_timings, write_timing_table, ProportionalTimingEstimator, WordAligner,
};
use crate::core::{
    CoreError, CoreResult, ErrorKind, ReelConfig, RunId, ScriptResult, VisualAsset, VisualSource,
    WordTiming,
};

// =============================================================================
// Run Types
// =============================================================================

/// Orchestrator state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    ScriptStage,
    VisualStage,
    TimingStage,
    CompositionStage,
    Done,
    Aborted,
}

/// Overall outcome of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    /// Every stage succeeded
    Complete,
    /// Output produced, but at least one stage used a substitute
    CompleteWithFallbacks,
    /// Aborted without output
    Failed,
}

/// Stage at which a run aborted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailure {
    pub stage: StageId,
    pub kind: ErrorKind,
    pub detail: String,
}

impl StageFailure {
    fn from_error(stage: StageId, error: &CoreError) -> Self {
        let detail = match error {
            CoreError::Cancelled => "cancelled".to_string(),
            other => other.to_string(),
        };
        Self {
            stage,
            kind: error.kind(),
            detail,
        }
    }
}

/// Record of one pipeline run
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub run_id: RunId,
    pub config: ReelConfig,
    pub state: RunState,
    /// `None` for stages the run never reached
    pub script: Option<StageResult<ScriptResult>>,
    pub visual: Option<StageResult<VisualAsset>>,
    /// Degraded with an empty table when static captions were used
    pub timings: Option<StageResult<Vec<WordTiming>>>,
    pub composition: Option<StageResult<PathBuf>>,
    pub final_status: FinalStatus,
    pub failure: Option<StageFailure>,
    pub work_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Compact JSON-facing view of a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: RunId,
    pub final_status: FinalStatus,
    pub output_path: Option<PathBuf>,
    pub failure: Option<StageFailure>,
    pub stages: Vec<StageRecord>,
}

impl PipelineRun {
    fn new(run_id: RunId, config: ReelConfig, work_dir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            config,
            state: RunState::Init,
            script: None,
            visual: None,
            timings: None,
            composition: None,
            final_status: FinalStatus::Failed,
            failure: None,
            work_dir,
            started_at: now,
            finished_at: now,
        }
    }

    /// Composed reel, present only when the run produced output
    pub fn output_path(&self) -> Option<&Path> {
        self.composition
            .as_ref()
            .and_then(|c| c.value())
            .map(PathBuf::as_path)
    }

    pub fn is_failed(&self) -> bool {
        self.final_status == FinalStatus::Failed
    }

    /// Per-stage outcomes in pipeline order
    pub fn stage_records(&self) -> Vec<StageRecord> {
        let mut records = Vec::new();
        if let Some(script) = &self.script {
            records.push(StageRecord::from_result(StageId::ScriptVoice, script));
        }
        if let Some(visual) = &self.visual {
            records.push(StageRecord::from_result(StageId::Visual, visual));
        }
        if let Some(timings) = &self.timings {
            records.push(StageRecord::from_result(StageId::Timing, timings));
        }
        if let Some(composition) = &self.composition {
            records.push(StageRecord::from_result(StageId::Composition, composition));
        }
        if let Some(failure) = &self.failure {
            if failure.stage == StageId::Setup {
                records.insert(
                    0,
                    StageRecord {
                        stage: StageId::Setup,
                        status: StageStatus::Failed,
                        detail: Some(failure.detail.clone()),
                    },
                );
            }
        }
        records
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            final_status: self.final_status,
            output_path: self.output_path().map(Path::to_path_buf),
            failure: self.failure.clone(),
            stages: self.stage_records(),
        }
    }

    fn abort(mut self, stage: StageId, error: &CoreError) -> Self {
        warn!("Run aborted at {}: {}", stage, error);
        self.state = RunState::Aborted;
        self.final_status = FinalStatus::Failed;
        self.failure = Some(StageFailure::from_error(stage, error));
        self.finished_at = Utc::now();
        self
    }

    fn finish(mut self) -> Self {
        let degraded = self
            .stage_records()
            .iter()
            .any(|r| r.status == StageStatus::Degraded);
        self.state = RunState::Done;
        self.final_status = if degraded {
            FinalStatus::CompleteWithFallbacks
        } else {
            FinalStatus::Complete
        };
        self.finished_at = Utc::now();
        self
    }
}

impl RunSummary {
    /// Summary for a config rejected before a run could start, shaped like
    /// the one [`PipelineOrchestrator::run`] reports for a setup failure.
    pub fn rejected(error: &CoreError) -> Self {
        let failure = StageFailure::from_error(StageId::Setup, error);
        Self {
            run_id: ulid::Ulid::new().to_string(),
            final_status: FinalStatus::Failed,
            output_path: None,
            stages: vec![StageRecord {
                stage: StageId::Setup,
                status: StageStatus::Failed,
                detail: Some(failure.detail.clone()),
            }],
            failure: Some(failure),
        }
    }
}

// =============================================================================
// Timeouts
// =============================================================================

/// Upper bound for each external call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineTimeouts {
    pub script_voice: Duration,
    pub visual: Duration,
    pub alignment: Duration,
    /// Also bounds placeholder rendering
    pub compose: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            script_voice: Duration::from_secs(180),
            visual: Duration::from_secs(300),
            alignment: Duration::from_secs(60),
            compose: Duration::from_secs(600),
        }
    }
}

/// Runs `future` under `limit`; running out of time is a stage failure
async fn with_timeout<T>(
    stage: StageId,
    limit: Duration,
    future: impl Future<Output = CoreResult<T>>,
) -> CoreResult<T> {
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout(format!(
            "{} stage exceeded {:.1}s",
            stage,
            limit.as_secs_f64()
        ))),
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs reels through the stage sequence.
///
/// Holds collaborators and configuration only; every run gets its own
/// working directory and [`PipelineRun`]. The optional visual cache is the
/// one thing shared between runs.
pub struct PipelineOrchestrator {
    script_provider: Arc<dyn ScriptVoiceProvider>,
    visual_provider: Arc<dyn VisualProvider>,
    composer: Arc<dyn ReelComposer>,
    aligner: Arc<dyn WordAligner>,
    classifier: CaptionClassifier,
    voices: VoiceMap,
    policy: FallbackPolicy,
    timeouts: PipelineTimeouts,
    cache: Option<VisualCache>,
    work_root: PathBuf,
    output_dir: PathBuf,
}

/// Builder for [`PipelineOrchestrator`]
pub struct PipelineOrchestratorBuilder {
    inner: PipelineOrchestrator,
}

impl PipelineOrchestratorBuilder {
    /// Replaces the word aligner (proportional estimation by default)
    pub fn aligner(mut self, aligner: Arc<dyn WordAligner>) -> Self {
        self.inner.aligner = aligner;
        self
    }

    pub fn classifier(mut self, classifier: CaptionClassifier) -> Self {
        self.inner.classifier = classifier;
        self
    }

    pub fn voices(mut self, voices: VoiceMap) -> Self {
        self.inner.voices = voices;
        self
    }

    pub fn policy(mut self, policy: FallbackPolicy) -> Self {
        self.inner.policy = policy;
        self
    }

    pub fn timeouts(mut self, timeouts: PipelineTimeouts) -> Self {
        self.inner.timeouts = timeouts;
        self
    }

    pub fn cache(mut self, cache: VisualCache) -> Self {
        self.inner.cache = Some(cache);
        self
    }

    /// Parent of the per-run working directories
    pub fn work_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.work_root = path.into();
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.output_dir = path.into();
        self
    }

    pub fn build(self) -> PipelineOrchestrator {
        self.inner
    }
}

impl PipelineOrchestrator {
    pub fn builder(
        script_provider: Arc<dyn ScriptVoiceProvider>,
        visual_provider: Arc<dyn VisualProvider>,
        composer: Arc<dyn ReelComposer>,
    ) -> PipelineOrchestratorBuilder {
        PipelineOrchestratorBuilder {
            inner: Self {
                script_provider,
                visual_provider,
                composer,
                aligner: Arc::new(ProportionalTimingEstimator::new()),
                classifier: CaptionClassifier::default(),
                voices: VoiceMap::default(),
                policy: FallbackPolicy::default(),
                timeouts: PipelineTimeouts::default(),
                cache: None,
                work_root: PathBuf::from("output").join("work"),
                output_dir: PathBuf::from("output"),
            },
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs one reel to completion, abort or cancellation.
    ///
    /// Never returns an error: failures are reported in the returned
    /// [`PipelineRun`].
    pub async fn run(&self, config: &ReelConfig, cancel: &CancellationToken) -> PipelineRun {
        let run_id = ulid::Ulid::new().to_string();
        self.execute(run_id, config, cancel).await
    }

    #[tracing::instrument(skip_all, fields(run_id = %run_id, topic = %config.topic))]
    async fn execute(
        &self,
        run_id: RunId,
        config: &ReelConfig,
        cancel: &CancellationToken,
    ) -> PipelineRun {
        let workspace = RunWorkspace::new(
            &self.work_root,
            &self.output_dir,
            &run_id,
            &config.output_name,
        );
        let mut run = PipelineRun::new(run_id, config.clone(), workspace.run_dir().to_path_buf());
        info!("Starting reel run");

        if let Err(e) = config.validate().and_then(|_| workspace.prepare()) {
            return run.abort(StageId::Setup, &e);
        }

        // Script + voice
        if let Err(e) = cancel.check() {
            return run.abort(StageId::ScriptVoice, &e);
        }
        run.state = RunState::ScriptStage;
        let script = match self.script_stage(config, &workspace).await {
            Ok(script) => script,
            Err(e) => {
                run.script = Some(StageResult::failed(e.to_string()));
                return run.abort(StageId::ScriptVoice, &e);
            }
        };
        run.script = Some(StageResult::ok(script.clone()));

        // Visual
        if let Err(e) = cancel.check() {
            return run.abort(StageId::Visual, &e);
        }
        run.state = RunState::VisualStage;
        let visual = match self.visual_stage(config, &script, &workspace).await {
            Ok(result) => result,
            Err(e) => {
                run.visual = Some(StageResult::failed(e.to_string()));
                return run.abort(StageId::Visual, &e);
            }
        };
        let Some(visual_asset) = visual.value().cloned() else {
            let e = CoreError::Internal("Visual stage produced no asset".to_string());
            return run.abort(StageId::Visual, &e);
        };
        run.visual = Some(visual);

        // Timing
        if let Err(e) = cancel.check() {
            return run.abort(StageId::Timing, &e);
        }
        run.state = RunState::TimingStage;
        let (timings, plan) = match self.timing_stage(&script, &workspace).await {
            Ok(result) => result,
            Err(e) => {
                run.timings = Some(StageResult::failed(e.to_string()));
                return run.abort(StageId::Timing, &e);
            }
        };
        run.timings = Some(timings);

        // Composition
        if let Err(e) = cancel.check() {
            return run.abort(StageId::Composition, &e);
        }
        run.state = RunState::CompositionStage;
        let composed = self
            .composition_stage(&script, &visual_asset, plan, &workspace)
            .await;
        discard_partial_output(&workspace.partial_output_path()).await;
        self.release_visual(&visual_asset, &workspace).await;
        match composed {
            Ok(result) => run.composition = Some(result),
            Err(e) => {
                run.composition = Some(StageResult::failed(e.to_string()));
                return run.abort(StageId::Composition, &e);
            }
        }

        let run = run.finish();
        info!(
            "Run finished: {:?} → {}",
            run.final_status,
            workspace.output_path().display()
        );
        run
    }

    async fn script_stage(
        &self,
        config: &ReelConfig,
        workspace: &RunWorkspace,
    ) -> CoreResult<ScriptResult> {
        let request = ScriptRequest {
            topic: config.topic.trim().to_string(),
            tone: config.tone,
            duration_seconds: config.duration_seconds,
            voice: self.voices.resolve(config.tone, config.voice.as_deref()),
        };
        info!(
            "Script stage: {} ({}, {}s)",
            self.script_provider.name(),
            request.tone,
            request.duration_seconds
        );

        let audio_dir = workspace.audio_dir();
        let script = with_timeout(
            StageId::ScriptVoice,
            self.timeouts.script_voice,
            self.script_provider
                .generate_script_and_voice(&request, &audio_dir),
        )
        .await?;

        // The script stage has no substitute; a malformed result is fatal.
        script
            .validate()
            .map_err(|e| CoreError::GenerationFailed(e.to_string()))?;
        debug!(
            "Script: {} words, {:.2}s of audio",
            script.word_count(),
            script.audio_duration_seconds
        );
        Ok(script)
    }

    async fn visual_stage(
        &self,
        config: &ReelConfig,
        script: &ScriptResult,
        workspace: &RunWorkspace,
    ) -> CoreResult<StageResult<VisualAsset>> {
        let prompt = config
            .visual_prompt
            .clone()
            .or_else(|| script.visual_prompt.clone())
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| fallback_visual_prompt(config.tone));
        let request = VisualRequest {
            prompt,
            style: config.visual_style.clone(),
            model: config.visual_model.clone(),
        };
        let duration = script.audio_duration_seconds;

        if let Some(cache) = &self.cache {
            if let Some(asset) = cache.get(&request).await {
                info!("Visual cache hit: {}", asset.path.display());
                return Ok(StageResult::ok(asset));
            }
        }

        info!("Visual stage: {}", self.visual_provider.name());
        let visual_dir = workspace.visual_dir();
        let error = match with_timeout(
            StageId::Visual,
            self.timeouts.visual,
            self.visual_provider
                .generate_visual(&request, duration, &visual_dir),
        )
        .await
        {
            Ok(asset) => {
                if let Some(cache) = &self.cache {
                    cache.insert(&request, asset.clone()).await;
                }
                return Ok(StageResult::ok(asset));
            }
            Err(e) => e,
        };

        match self.policy.decide(StageId::Visual, &error) {
            FallbackDecision::PlaceholderVisual => {
                warn!("Visual generation failed, using placeholder: {}", error);
                let mut placeholder = with_timeout(
                    StageId::Visual,
                    self.timeouts.compose,
                    self.composer.render_placeholder(duration, &visual_dir),
                )
                .await
                .map_err(|placeholder_error| {
                    CoreError::GenerationFailed(format!(
                        "{}; placeholder also failed: {}",
                        error, placeholder_error
                    ))
                })?;
                placeholder.duration_seconds = duration;
                Ok(StageResult::degraded(placeholder, error.to_string()))
            }
            _ => Err(error),
        }
    }

    async fn timing_stage(
        &self,
        script: &ScriptResult,
        workspace: &RunWorkspace,
    ) -> CoreResult<(StageResult<Vec<WordTiming>>, CaptionPlan)> {
        info!("Timing stage: {}", self.aligner.name());
        let error = match self.align(script, workspace).await {
            Ok(timings) => {
                let plan = CaptionPlan::Animated(timings.clone());
                return Ok((StageResult::ok(timings), plan));
            }
            Err(e) => e,
        };

        match self.policy.decide(StageId::Timing, &error) {
            FallbackDecision::StaticCaptions => {
                warn!("Word timing failed, using static captions: {}", error);
                Ok((
                    StageResult::degraded(Vec::new(), error.to_string()),
                    CaptionPlan::Static,
                ))
            }
            _ => Err(error),
        }
    }

    async fn align(
        &self,
        script: &ScriptResult,
        workspace: &RunWorkspace,
    ) -> CoreResult<Vec<WordTiming>> {
        let mut timings = with_timeout(
            StageId::Timing,
            self.timeouts.alignment,
            self.aligner.align(script),
        )
        .await?;

        validate_timings(&timings, script.word_count(), script.audio_duration_seconds)?;
        self.classifier.tag_all(&mut timings);

        write_timing_table(&workspace.timing_table_path(), &timings)
            .map_err(|e| CoreError::CaptionTimingFailed(e.to_string()))?;
        debug!("Timing table: {}", workspace.timing_table_path().display());
        Ok(timings)
    }

    async fn composition_stage(
        &self,
        script: &ScriptResult,
        visual: &VisualAsset,
        plan: CaptionPlan,
        workspace: &RunWorkspace,
    ) -> CoreResult<StageResult<PathBuf>> {
        info!("Composition stage: {}", self.composer.name());
        let output_path = workspace.output_path().to_path_buf();

        let error = match self.compose(script, visual, &plan, workspace).await {
            Ok(()) => return Ok(StageResult::ok(output_path)),
            Err(e) => e,
        };

        let decision = self.policy.decide(StageId::Composition, &error);
        if decision != FallbackDecision::StaticCaptions || plan.is_static() {
            return Err(error);
        }

        warn!("Animated captions failed, retrying with static captions: {}", error);
        discard_partial_output(&workspace.partial_output_path()).await;
        self.compose(script, visual, &CaptionPlan::Static, workspace)
            .await?;
        Ok(StageResult::degraded(output_path, error.to_string()))
    }

    async fn compose(
        &self,
        script: &ScriptResult,
        visual: &VisualAsset,
        plan: &CaptionPlan,
        workspace: &RunWorkspace,
    ) -> CoreResult<()> {
        // The reel is written inside the run directory and only replaces
        // `output_path` once it is complete.
        let partial = workspace.partial_output_path();
        let request = CompositionRequest {
            script,
            visual,
            captions: plan,
            work_dir: workspace.run_dir(),
            output_path: &partial,
        };
        with_timeout(
            StageId::Composition,
            self.timeouts.compose,
            self.composer.compose_output(&request),
        )
        .await?;

        promote_file(&partial, workspace.output_path())
            .map_err(|e| CoreError::CompositionFailed(format!("Failed to publish reel: {}", e)))
    }

    /// Deletes this run's visual files unless the cache now points at them
    async fn release_visual(&self, visual: &VisualAsset, workspace: &RunWorkspace) {
        let visual_dir = workspace.visual_dir();
        let cached = self.cache.is_some()
            && visual.source == VisualSource::Generated
            && visual.path.starts_with(&visual_dir);
        if cached {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&visual_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", visual_dir.display(), e);
            }
        }
    }
}

/// Removes a half-written reel from the run directory
async fn discard_partial_output(path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove partial output {}: {}", path.display(), e);
        }
    }
}
