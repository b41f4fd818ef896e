//! Pipeline Module
//!
//! Stage sequencing, fallback routing and batch execution.
//!
//! # Architecture
//!
//! ```text
//! Init → ScriptStage → VisualStage → TimingStage → CompositionStage → Done
//!            │              │             │               │
//!            └──────────────┴─────────────┴───────────────┴──→ Aborted
//! ```
//!
//! Each stage yields a [`StageResult`]. A failed stage is answered by the
//! [`FallbackPolicy`]: the visual stage falls back to a placeholder, timing
//! and caption rendering fall back to static captions, and everything else
//! aborts the run.

mod batch;
mod cancel;
mod fallback;
mod orchestrator;
mod stage;

pub use batch::{check_output_collisions, BatchRunner};
pub use cancel::CancellationToken;
pub use fallback::{FallbackDecision, FallbackPolicy};
pub use orchestrator::{
    FinalStatus, PipelineOrchestrator, PipelineOrchestratorBuilder, PipelineRun, PipelineTimeouts,
    RunState, RunSummary, StageFailure,
};
pub use stage::{StageId, StageRecord, StageResult, StageStatus};
