use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::challenge::ChallengeType;
use crate::expression::{BlinkCounter, ExpressionState};

/// Protocol state of a liveness session.
///
/// `Idle` is entered and left only by the caller (capture switched off/on);
/// the state machine itself cycles Waiting → Analyzing → Challenge → Result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessState {
    Idle,
    Waiting,
    Analyzing,
    Challenge,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Why a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AccessGranted,
    StaticImage,
    SpoofDuringChallenge,
    Timeout,
}

impl Outcome {
    pub fn verdict(self) -> Verdict {
        match self {
            Self::AccessGranted => Verdict::Pass,
            Self::StaticImage | Self::SpoofDuringChallenge | Self::Timeout => Verdict::Fail,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::AccessGranted => "Access granted",
            Self::StaticImage => "Static image detected",
            Self::SpoofDuringChallenge => "Spoof detected during challenge",
            Self::Timeout => "Challenge timed out",
        }
    }
}

/// Verdict of one completed cycle. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessResult {
    pub verdict: Verdict,
    pub outcome: Outcome,
    pub reason: String,
}

impl From<Outcome> for LivenessResult {
    fn from(outcome: Outcome) -> Self {
        Self {
            verdict: outcome.verdict(),
            outcome,
            reason: outcome.reason().to_string(),
        }
    }
}

/// Per-frame output for the presentation layer. Plain data, no behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub state: LivenessState,
    pub instruction_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_type: Option<ChallengeType>,
    /// Seconds left to complete the current challenge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<f64>,
    pub blink_count: u32,
    pub motion_score: f64,
    /// Expression classified for this frame; absent when no face was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<ExpressionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<LivenessResult>,
}

/// Life-cycle state of one liveness session.
///
/// Owned by the caller and passed to
/// [`LivenessEngine::process`](crate::machine::LivenessEngine::process) on
/// every frame; only the engine mutates it. A session is never torn down,
/// only reinitialized when the face is lost or the caller resets it.
#[derive(Debug, Clone)]
pub struct LivenessSession {
    pub(crate) state: LivenessState,
    pub(crate) challenge_type: Option<ChallengeType>,
    pub(crate) challenge_started_at: Option<Duration>,
    pub(crate) result: Option<LivenessResult>,
    pub(crate) result_started_at: Option<Duration>,
    pub(crate) blink: BlinkCounter,
    pub(crate) motion_score: f64,
}

impl LivenessSession {
    pub fn new(blink_min_closed_frames: u32) -> Self {
        Self {
            state: LivenessState::Waiting,
            challenge_type: None,
            challenge_started_at: None,
            result: None,
            result_started_at: None,
            blink: BlinkCounter::new(blink_min_closed_frames),
            motion_score: 0.0,
        }
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn challenge_type(&self) -> Option<ChallengeType> {
        self.challenge_type
    }

    pub fn challenge_started_at(&self) -> Option<Duration> {
        self.challenge_started_at
    }

    pub fn result(&self) -> Option<&LivenessResult> {
        self.result.as_ref()
    }

    pub fn result_started_at(&self) -> Option<Duration> {
        self.result_started_at
    }

    pub fn blink_count(&self) -> u32 {
        self.blink.count()
    }

    pub fn is_eye_closed(&self) -> bool {
        self.blink.is_eye_closed()
    }

    pub fn motion_score(&self) -> f64 {
        self.motion_score
    }

    /// Back to initial values in `state`, keeping the blink debounce setting.
    pub(crate) fn clear(&mut self, state: LivenessState) {
        self.state = state;
        self.challenge_type = None;
        self.challenge_started_at = None;
        self.result = None;
        self.result_started_at = None;
        self.blink.reset();
        self.motion_score = 0.0;
    }
}

impl Default for LivenessSession {
    fn default() -> Self {
        Self::new(1)
    }
}
