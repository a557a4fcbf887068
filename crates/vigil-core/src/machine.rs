//! The liveness state machine.
//!
//! One call to [`LivenessEngine::process`] per camera frame, in frame order.
//! The engine never blocks and never reads a clock: every timing decision
//! compares the frame's own timestamp against the instant the current
//! challenge or result began.
//!
//! ```text
//!   Waiting ──(history ≥ analysis_min_frames)──▶ Analyzing
//!   Analyzing ──(score < static)──▶ Result[static image]
//!   Analyzing ──(score ≥ static)──▶ Challenge (random pick)
//!   Challenge ──(score < static − margin)──▶ Result[spoof]
//!   Challenge ──(expression matches)──▶ Result[access granted]
//!   Challenge ──(elapsed ≥ limit)──▶ Result[timeout]
//!   Result ──(elapsed ≥ hold)──▶ Waiting
//!   any ──(face lost)──▶ Waiting
//! ```

use std::time::Duration;

use rand::rngs::StdRng;

use crate::challenge::{ChallengePicker, RandomPicker};
use crate::config::LivenessConfig;
use crate::error::{ConfigError, FrameError};
use crate::expression::{classify, ExpressionState, ExpressionThresholds};
use crate::landmarks::{LandmarkFrame, LandmarkLayout};
use crate::motion::MotionHistory;
use crate::session::{LivenessResult, LivenessSession, LivenessState, Outcome, StatusRecord};
use crate::signals;

const IDLE_TEXT: &str = "Session inactive";
const FACE_LOST_TEXT: &str = "Face not found";
const WAITING_TEXT: &str = "Scanning face...";
const ANALYZING_TEXT: &str = "Analyzing liveness...";

/// Drives [`LivenessSession`]s through the challenge-response protocol.
///
/// The engine owns the motion history and the challenge source; the session
/// is passed in by the caller on every call.
pub struct LivenessEngine<P = RandomPicker<StdRng>> {
    config: LivenessConfig,
    layout: LandmarkLayout,
    thresholds: ExpressionThresholds,
    challenge_limit: Duration,
    result_hold: Duration,
    motion: MotionHistory,
    picker: P,
}

impl LivenessEngine<RandomPicker<StdRng>> {
    /// Engine with challenges drawn from OS entropy.
    pub fn new(config: LivenessConfig) -> Result<Self, ConfigError> {
        Self::with_picker(config, RandomPicker::from_entropy())
    }

    /// Engine with a reproducible challenge sequence.
    pub fn seeded(config: LivenessConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_picker(config, RandomPicker::seeded(seed))
    }
}

impl<P: ChallengePicker> LivenessEngine<P> {
    pub fn with_picker(config: LivenessConfig, picker: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            thresholds: config.expression_thresholds(),
            challenge_limit: config.challenge_limit()?,
            result_hold: config.result_hold()?,
            motion: MotionHistory::new(config.motion_window_size, config.motion_min_samples),
            layout: LandmarkLayout::default(),
            config,
            picker,
        })
    }

    /// Use a landmark layout other than the 468-point mesh.
    pub fn with_layout(mut self, layout: LandmarkLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    pub fn layout(&self) -> &LandmarkLayout {
        &self.layout
    }

    pub fn motion(&self) -> &MotionHistory {
        &self.motion
    }

    /// A fresh session configured for this engine.
    pub fn new_session(&self) -> LivenessSession {
        LivenessSession::new(self.config.blink_min_closed_frames)
    }

    /// Advance `session` by one frame.
    ///
    /// `frame = None` is the face-lost event. A frame that fails validation is
    /// rejected with an error and leaves both the session and the motion
    /// history untouched.
    pub fn process(
        &mut self,
        session: &mut LivenessSession,
        frame: Option<&LandmarkFrame>,
        now: Duration,
    ) -> Result<StatusRecord, FrameError> {
        if let Some(frame) = frame {
            frame.validate(&self.layout)?;
        }

        if session.state == LivenessState::Idle {
            return Ok(status(session, IDLE_TEXT.to_string(), None, None));
        }

        let Some(frame) = frame else {
            self.face_lost(session);
            return Ok(status(session, FACE_LOST_TEXT.to_string(), None, None));
        };

        let signals = signals::extract(frame, &self.layout);
        let expression = classify(&signals, &self.thresholds);
        if session.blink.observe(expression) {
            tracing::debug!(blink_count = session.blink.count(), "blink completed");
        }
        session.motion_score = self.motion.update(frame, &self.layout);

        self.step(session, expression, now);

        let text = self.instruction(session, now);
        let remaining = self.time_remaining(session, now);
        Ok(status(session, text, Some(expression), remaining))
    }

    /// Explicit external reset. An idle session stays idle.
    pub fn reset(&mut self, session: &mut LivenessSession) {
        let next = if session.state == LivenessState::Idle {
            LivenessState::Idle
        } else {
            LivenessState::Waiting
        };
        tracing::debug!(from = ?session.state, "session reset");
        self.motion.reset();
        session.clear(next);
    }

    /// Switch capture on or off. Turning off parks the session in `Idle`;
    /// turning on starts a fresh cycle in `Waiting`.
    pub fn set_active(&mut self, session: &mut LivenessSession, active: bool) {
        let is_active = session.state != LivenessState::Idle;
        if active == is_active {
            return;
        }
        let next = if active {
            LivenessState::Waiting
        } else {
            LivenessState::Idle
        };
        tracing::debug!(from = ?session.state, to = ?next, "session activity changed");
        self.motion.reset();
        session.clear(next);
    }

    fn face_lost(&mut self, session: &mut LivenessSession) {
        if session.state != LivenessState::Waiting {
            tracing::debug!(from = ?session.state, "face lost, returning to waiting");
        }
        self.motion.reset();
        session.clear(LivenessState::Waiting);
    }

    fn step(&mut self, session: &mut LivenessSession, expression: ExpressionState, now: Duration) {
        match session.state {
            LivenessState::Idle => {}
            LivenessState::Waiting => {
                if self.motion.len() >= self.config.analysis_min_frames {
                    transition(session, LivenessState::Analyzing);
                }
            }
            LivenessState::Analyzing => {
                if session.motion_score < self.config.static_threshold {
                    enter_result(session, Outcome::StaticImage, now);
                } else {
                    let challenge = self.picker.pick();
                    session.challenge_type = Some(challenge);
                    session.challenge_started_at = Some(now);
                    tracing::debug!(%challenge, "challenge issued");
                    transition(session, LivenessState::Challenge);
                }
            }
            LivenessState::Challenge => {
                let spoof_floor = self.config.static_threshold - self.config.spoof_margin;
                let required = session.challenge_type.map(|c| c.required_expression());
                let elapsed = elapsed_since(session.challenge_started_at, now);

                if session.motion_score < spoof_floor {
                    enter_result(session, Outcome::SpoofDuringChallenge, now);
                } else if required == Some(expression) {
                    enter_result(session, Outcome::AccessGranted, now);
                } else if elapsed >= self.challenge_limit {
                    enter_result(session, Outcome::Timeout, now);
                }
            }
            LivenessState::Result => {
                if elapsed_since(session.result_started_at, now) >= self.result_hold {
                    tracing::debug!("result hold elapsed, starting new cycle");
                    self.motion.reset();
                    session.clear(LivenessState::Waiting);
                }
            }
        }
    }

    fn instruction(&self, session: &LivenessSession, now: Duration) -> String {
        match session.state {
            LivenessState::Idle => IDLE_TEXT.to_string(),
            LivenessState::Waiting => WAITING_TEXT.to_string(),
            LivenessState::Analyzing => ANALYZING_TEXT.to_string(),
            LivenessState::Challenge => {
                let remaining = self.time_remaining(session, now).unwrap_or(0.0);
                let action = session.challenge_type.map_or("", |c| c.instruction());
                format!("Action: {action} ({remaining:.1}s)")
            }
            LivenessState::Result => session
                .result
                .as_ref()
                .map_or_else(String::new, |r| r.reason.clone()),
        }
    }

    fn time_remaining(&self, session: &LivenessSession, now: Duration) -> Option<f64> {
        if session.state != LivenessState::Challenge {
            return None;
        }
        let elapsed = elapsed_since(session.challenge_started_at, now);
        Some(self.challenge_limit.saturating_sub(elapsed).as_secs_f64())
    }
}

fn elapsed_since(start: Option<Duration>, now: Duration) -> Duration {
    start.map_or(Duration::ZERO, |s| now.saturating_sub(s))
}

fn transition(session: &mut LivenessSession, next: LivenessState) {
    tracing::debug!(from = ?session.state, to = ?next, "state transition");
    session.state = next;
}

fn enter_result(session: &mut LivenessSession, outcome: Outcome, now: Duration) {
    let result = LivenessResult::from(outcome);
    tracing::info!(
        verdict = ?result.verdict,
        reason = %result.reason,
        challenge = ?session.challenge_type,
        motion_score = session.motion_score,
        "liveness verdict"
    );
    session.result = Some(result);
    session.result_started_at = Some(now);
    transition(session, LivenessState::Result);
}

fn status(
    session: &LivenessSession,
    instruction_text: String,
    expression: Option<ExpressionState>,
    time_remaining: Option<f64>,
) -> StatusRecord {
    StatusRecord {
        state: session.state,
        instruction_text,
        challenge_type: session.challenge_type,
        time_remaining,
        blink_count: session.blink.count(),
        motion_score: session.motion_score,
        expression,
        result: session.result.clone(),
    }
}
