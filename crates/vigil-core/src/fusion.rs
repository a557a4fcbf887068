//! Combines the behavioral verdict with an external texture liveness score.
//!
//! The texture score comes from a model outside this crate (a print/replay
//! classifier on the face crop). Access requires both signals: the texture
//! score must clear the threshold and the behavioral cycle must have passed.

use serde::{Deserialize, Serialize};

use crate::session::{LivenessResult, LivenessState, StatusRecord, Verdict};

/// Which signal decided the fused outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionReason {
    Accepted,
    /// Texture score at or below the threshold (or not a number).
    Texture,
    /// Texture was fine but the challenge cycle failed.
    Behavior,
}

impl FusionReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Accepted => "Access granted",
            Self::Texture => "Spoof detected (texture)",
            Self::Behavior => "Liveness challenge failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedDecision {
    pub verdict: Verdict,
    pub reason: FusionReason,
    pub texture_score: f32,
}

/// Fuse a texture score with a completed behavioral result.
///
/// Texture is checked first, so a failing texture score is reported as the
/// reason even when the behavioral verdict also failed.
pub fn fuse(texture_score: f32, result: &LivenessResult, accept_threshold: f64) -> FusedDecision {
    let texture_ok = texture_score.is_finite() && f64::from(texture_score) > accept_threshold;

    let (verdict, reason) = if !texture_ok {
        (Verdict::Fail, FusionReason::Texture)
    } else if result.verdict != Verdict::Pass {
        (Verdict::Fail, FusionReason::Behavior)
    } else {
        (Verdict::Pass, FusionReason::Accepted)
    };

    FusedDecision {
        verdict,
        reason,
        texture_score,
    }
}

/// Fuses once per behavioral cycle and holds the decision for the rest of
/// the Result phase.
///
/// Fed with every status record a session produces. Fusion runs on the
/// record that enters Result, using the texture score of that frame; the
/// decision is dropped as soon as the session leaves Result.
#[derive(Debug, Clone, Default)]
pub struct FusionGate {
    /// `None` disables fusion.
    threshold: Option<f64>,
    in_result: bool,
    decision: Option<FusedDecision>,
}

impl FusionGate {
    pub fn new(threshold: Option<f64>) -> Self {
        Self {
            threshold,
            in_result: false,
            decision: None,
        }
    }

    /// Track `status`. Returns `true` when it is the first record of a
    /// Result phase.
    pub fn observe(&mut self, status: &StatusRecord, texture: Option<f32>) -> bool {
        let was_result = self.in_result;
        self.in_result = status.state == LivenessState::Result;

        if !self.in_result {
            self.decision = None;
            return false;
        }
        if was_result {
            return false;
        }

        self.decision = self.fuse_entry(status, texture);
        true
    }

    fn fuse_entry(&self, status: &StatusRecord, texture: Option<f32>) -> Option<FusedDecision> {
        let threshold = self.threshold?;
        let result = status.result.as_ref()?;
        let Some(texture) = texture else {
            tracing::debug!("no texture score on result frame, skipping fusion");
            return None;
        };
        let decision = fuse(texture, result, threshold);
        tracing::info!(
            verdict = ?decision.verdict,
            reason = ?decision.reason,
            texture,
            "fused decision"
        );
        Some(decision)
    }

    /// Decision held for the current Result phase, if fusion ran.
    pub fn decision(&self) -> Option<FusedDecision> {
        self.decision
    }

    /// Forget the current phase, e.g. after an external reset.
    pub fn clear(&mut self) {
        self.in_result = false;
        self.decision = None;
    }
}
