use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::expression::ExpressionThresholds;

/// Caller-supplied tuning for the liveness engine.
///
/// The numeric thresholds are empirical starting points, not calibrated
/// biometric constants. Every field has a default, so a TOML file only needs
/// the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Average EAR below which the eyes count as closed.
    pub blink_thresh: f64,
    /// Lower MAR bound of the open-mouth smile band.
    pub smile_thresh_low: f64,
    /// MAR above which the mouth counts as wide open (surprise).
    pub surprise_thresh: f64,
    /// Optional mouth-width / face-width ratio for closed-mouth smiles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smile_ratio_thresh: Option<f64>,
    /// Normalized margin both mouth corners must drop below the lip center.
    pub sad_margin: f64,
    /// Motion score below which the face is treated as a static image.
    pub static_threshold: f64,
    /// Extra margin below `static_threshold` that aborts a running challenge.
    pub spoof_margin: f64,
    pub challenge_limit_seconds: f64,
    pub result_hold_seconds: f64,
    /// Capacity of the motion history window.
    pub motion_window_size: usize,
    /// Samples required before the motion score is computed at all.
    pub motion_min_samples: usize,
    /// History length that moves a session from Waiting to Analyzing.
    pub analysis_min_frames: usize,
    /// Consecutive closed-eye frames needed for a blink to count.
    pub blink_min_closed_frames: u32,
    pub fusion_accept_threshold: f64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            blink_thresh: 0.18,
            smile_thresh_low: 0.3,
            surprise_thresh: 0.5,
            smile_ratio_thresh: None,
            sad_margin: 0.02,
            static_threshold: 1.5,
            spoof_margin: 0.5,
            challenge_limit_seconds: 5.0,
            result_hold_seconds: 3.0,
            motion_window_size: 30,
            motion_min_samples: 10,
            analysis_min_frames: 20,
            blink_min_closed_frames: 1,
            fusion_accept_threshold: 0.7,
        }
    }
}

impl LivenessConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn expression_thresholds(&self) -> ExpressionThresholds {
        ExpressionThresholds {
            blink: self.blink_thresh as f32,
            smile_low: self.smile_thresh_low as f32,
            surprise: self.surprise_thresh as f32,
            smile_ratio: self.smile_ratio_thresh.map(|r| r as f32),
            sad_margin: self.sad_margin as f32,
        }
    }

    pub fn challenge_limit(&self) -> Result<Duration, ConfigError> {
        seconds("challenge_limit_seconds", self.challenge_limit_seconds)
    }

    pub fn result_hold(&self) -> Result<Duration, ConfigError> {
        seconds("result_hold_seconds", self.result_hold_seconds)
    }

    /// Reject combinations the state machine cannot make progress with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("blink_thresh", self.blink_thresh),
            ("smile_thresh_low", self.smile_thresh_low),
            ("surprise_thresh", self.surprise_thresh),
            ("sad_margin", self.sad_margin),
            ("static_threshold", self.static_threshold),
            ("spoof_margin", self.spoof_margin),
            ("challenge_limit_seconds", self.challenge_limit_seconds),
            ("result_hold_seconds", self.result_hold_seconds),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, format!("{value} is not a finite non-negative number")));
            }
        }
        self.challenge_limit()?;
        self.result_hold()?;

        if self.smile_thresh_low >= self.surprise_thresh {
            return Err(invalid(
                "smile_thresh_low",
                format!(
                    "{} must be below surprise_thresh ({})",
                    self.smile_thresh_low, self.surprise_thresh
                ),
            ));
        }
        if let Some(ratio) = self.smile_ratio_thresh {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(invalid("smile_ratio_thresh", format!("{ratio} must be positive")));
            }
        }
        if !(0.0..=1.0).contains(&self.fusion_accept_threshold) {
            return Err(invalid(
                "fusion_accept_threshold",
                format!("{} is outside [0, 1]", self.fusion_accept_threshold),
            ));
        }
        if self.motion_min_samples < 2 {
            return Err(invalid("motion_min_samples", "need at least 2 samples".into()));
        }
        if self.motion_window_size < self.motion_min_samples {
            return Err(invalid(
                "motion_window_size",
                format!(
                    "{} is smaller than motion_min_samples ({})",
                    self.motion_window_size, self.motion_min_samples
                ),
            ));
        }
        if self.analysis_min_frames > self.motion_window_size {
            return Err(invalid(
                "analysis_min_frames",
                format!(
                    "{} exceeds motion_window_size ({}); analysis would never start",
                    self.analysis_min_frames, self.motion_window_size
                ),
            ));
        }
        if self.blink_min_closed_frames == 0 {
            return Err(invalid("blink_min_closed_frames", "must be at least 1".into()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| invalid(field, format!("{value} seconds is not a valid duration: {e}")))
}
