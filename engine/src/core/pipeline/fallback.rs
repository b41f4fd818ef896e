//! Fallback Policy
//!
//! Per-stage substitution rules consulted when a stage fails.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::stage::StageId;
use crate::core::CoreError;

/// What to do after a stage failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackDecision {
    /// No viable substitute: the run aborts
    Abort,
    /// Render a solid-color visual lasting as long as the voiceover
    PlaceholderVisual,
    /// Burn in unanimated captions instead of word-timed ones
    StaticCaptions,
}

/// Stage → substitution lookup.
///
/// Invalid input and cancellation always abort, whatever the rule says.
/// Composition only falls back when the caption sub-step failed.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackPolicy {
    rules: HashMap<StageId, FallbackDecision>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        let rules = HashMap::from([
            (StageId::Setup, FallbackDecision::Abort),
            (StageId::ScriptVoice, FallbackDecision::Abort),
            (StageId::Visual, FallbackDecision::PlaceholderVisual),
            (StageId::Timing, FallbackDecision::StaticCaptions),
            (StageId::Composition, FallbackDecision::StaticCaptions),
        ]);
        Self { rules }
    }
}

impl FallbackPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that aborts on every failure
    pub fn strict() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Overrides the rule for one stage
    pub fn with_rule(mut self, stage: StageId, decision: FallbackDecision) -> Self {
        self.rules.insert(stage, decision);
        self
    }

    /// Configured rule for a stage, ignoring the error
    pub fn rule(&self, stage: StageId) -> FallbackDecision {
        self.rules
            .get(&stage)
            .copied()
            .unwrap_or(FallbackDecision::Abort)
    }

    /// Decides how to answer `error` raised by `stage`
    pub fn decide(&self, stage: StageId, error: &CoreError) -> FallbackDecision {
        if !error.is_recoverable() {
            return FallbackDecision::Abort;
        }

        if stage == StageId::Composition && !matches!(error, CoreError::CaptionTimingFailed(_)) {
            return FallbackDecision::Abort;
        }
        self.rule(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation() -> CoreError {
        CoreError::GenerationFailed("provider down".to_string())
    }

    #[test]
    fn test_default_rules() {
        let policy = FallbackPolicy::default();
        assert_eq!(
            policy.decide(StageId::ScriptVoice, &generation()),
            FallbackDecision::Abort
        );
        assert_eq!(
            policy.decide(StageId::Visual, &generation()),
            FallbackDecision::PlaceholderVisual
        );
        assert_eq!(
            policy.decide(StageId::Visual, &CoreError::Timeout("visual".into())),
            FallbackDecision::PlaceholderVisual
        );
        assert_eq!(
            policy.decide(
                StageId::Timing,
                &CoreError::CaptionTimingFailed("count".into())
            ),
            FallbackDecision::StaticCaptions
        );
    }

    #[test]
    fn test_composition_falls_back_only_for_caption_timing() {
        let policy = FallbackPolicy::default();
        assert_eq!(
            policy.decide(
                StageId::Composition,
                &CoreError::CaptionTimingFailed("x".into())
            ),
            FallbackDecision::StaticCaptions
        );
        assert_eq!(
            policy.decide(
                StageId::Composition,
                &CoreError::CompositionFailed("encoder".into())
            ),
            FallbackDecision::Abort
        );
    }

    #[test]
    fn test_invalid_input_and_cancel_always_abort() {
        let policy = FallbackPolicy::default();
        assert_eq!(
            policy.decide(StageId::Visual, &CoreError::InvalidInput("bad".into())),
            FallbackDecision::Abort
        );
        assert_eq!(
            policy.decide(StageId::Visual, &CoreError::Cancelled),
            FallbackDecision::Abort
        );
    }

    #[test]
    fn test_unrecoverable_errors_abort_at_every_stage() {
        let policy = FallbackPolicy::default();
        let errors = [
            CoreError::InvalidInput("bad".into()),
            CoreError::Cancelled,
            CoreError::GenerationFailed("503".into()),
            CoreError::Timeout("visual".into()),
            CoreError::CaptionTimingFailed("count".into()),
        ];
        for error in &errors {
            if error.is_recoverable() {
                continue;
            }
            for stage in [StageId::Visual, StageId::Timing, StageId::Composition] {
                assert_eq!(policy.decide(stage, error), FallbackDecision::Abort);
            }
        }
        assert!(policy.decide(StageId::Visual, &errors[2]) != FallbackDecision::Abort);
    }

    #[test]
    fn test_overrides() {
        let policy = FallbackPolicy::default().with_rule(StageId::Visual, FallbackDecision::Abort);
        assert_eq!(
            policy.decide(StageId::Visual, &generation()),
            FallbackDecision::Abort
        );

        let strict = FallbackPolicy::strict();
        assert_eq!(
            strict.decide(StageId::Timing, &generation()),
            FallbackDecision::Abort
        );
    }
}
