//! Active/passive face liveness detection over per-frame facial landmarks.
//!
//! The pipeline per frame is: [`signals::extract`] → [`expression::classify`]
//! → [`motion::MotionHistory::update`] → [`machine::LivenessEngine::process`],
//! which advances a [`session::LivenessSession`] and returns a
//! [`session::StatusRecord`] for the presentation layer. An external texture
//! score can be combined with a finished cycle through [`fusion::fuse`].

pub mod challenge;
pub mod config;
pub mod error;
pub mod expression;
pub mod fusion;
pub mod landmarks;
pub mod machine;
pub mod motion;
pub mod session;
pub mod signals;
pub mod synthetic;
pub mod trace;

pub use challenge::{ChallengePicker, ChallengeType, RandomPicker, ScriptedPicker};
pub use config::LivenessConfig;
pub use error::{ConfigError, FrameError, TraceError};
pub use expression::{classify, BlinkCounter, ExpressionState, ExpressionThresholds};
pub use fusion::{fuse, FusedDecision, FusionGate, FusionReason};
pub use landmarks::{LandmarkFrame, LandmarkLayout, Point, MESH_POINT_COUNT};
pub use machine::LivenessEngine;
pub use motion::MotionHistory;
pub use session::{LivenessResult, LivenessSession, LivenessState, Outcome, StatusRecord, Verdict};
pub use signals::SignalVector;
pub use trace::FrameEvent;
