//! Discrete expression state from a signal vector, plus debounced blink
//! counting.
//!
//! Classification walks a fixed rule table and returns the first match. The
//! order matters: a closed eye wins over a wide-open mouth, so a frame that
//! satisfies both is reported as [`ExpressionState::Blinking`].

use serde::{Deserialize, Serialize};

use crate::signals::SignalVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionState {
    Neutral,
    Blinking,
    Smiling,
    Surprised,
    SadOrCrying,
}

impl std::fmt::Display for ExpressionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Neutral => "neutral",
            Self::Blinking => "blinking",
            Self::Smiling => "smiling",
            Self::Surprised => "surprised",
            Self::SadOrCrying => "sad",
        };
        f.write_str(label)
    }
}

/// Thresholds used by [`classify`], normally derived from
/// [`LivenessConfig`](crate::config::LivenessConfig).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionThresholds {
    pub blink: f32,
    pub smile_low: f32,
    pub surprise: f32,
    pub smile_ratio: Option<f32>,
    pub sad_margin: f32,
}

impl Default for ExpressionThresholds {
    fn default() -> Self {
        crate::config::LivenessConfig::default().expression_thresholds()
    }
}

struct Rule {
    state: ExpressionState,
    matches: fn(&SignalVector, &ExpressionThresholds) -> bool,
}

/// Evaluated top to bottom; first match wins.
const RULES: [Rule; 4] = [
    Rule {
        state: ExpressionState::Blinking,
        matches: is_blinking,
    },
    Rule {
        state: ExpressionState::Surprised,
        matches: is_surprised,
    },
    Rule {
        state: ExpressionState::Smiling,
        matches: is_smiling,
    },
    Rule {
        state: ExpressionState::SadOrCrying,
        matches: is_sad,
    },
];

fn is_blinking(s: &SignalVector, t: &ExpressionThresholds) -> bool {
    s.ear_avg < t.blink
}

fn is_surprised(s: &SignalVector, t: &ExpressionThresholds) -> bool {
    s.mar > t.surprise
}

// Both corners must sit below the lip center by the margin.
fn is_sad(s: &SignalVector, t: &ExpressionThresholds) -> bool {
    s.lip_corner_drop > t.sad_margin
}

fn is_smiling(s: &SignalVector, t: &ExpressionThresholds) -> bool {
    let open_smile = s.mar > t.smile_low && s.mar <= t.surprise;
    let closed_smile = t
        .smile_ratio
        .is_some_and(|ratio| s.smile_ratio > ratio && s.mar <= t.smile_low);
    open_smile || closed_smile
}

/// Map a signal vector to exactly one expression state.
pub fn classify(signals: &SignalVector, thresholds: &ExpressionThresholds) -> ExpressionState {
    RULES
        .iter()
        .find(|rule| (rule.matches)(signals, thresholds))
        .map_or(ExpressionState::Neutral, |rule| rule.state)
}

/// Counts completed blinks with hysteresis.
///
/// Closing the eye only arms the counter; the blink is counted on the first
/// frame the eye is open again, provided it stayed closed for at least
/// `min_closed_frames` frames. A run of closed frames therefore counts once.
#[derive(Debug, Clone)]
pub struct BlinkCounter {
    count: u32,
    closed_frames: u32,
    min_closed_frames: u32,
}

impl Default for BlinkCounter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl BlinkCounter {
    pub fn new(min_closed_frames: u32) -> Self {
        Self {
            count: 0,
            closed_frames: 0,
            min_closed_frames: min_closed_frames.max(1),
        }
    }

    /// Feed one frame's expression. Returns true when a blink completes.
    pub fn observe(&mut self, state: ExpressionState) -> bool {
        if state == ExpressionState::Blinking {
            self.closed_frames = self.closed_frames.saturating_add(1);
            return false;
        }

        let run = std::mem::take(&mut self.closed_frames);
        if run >= self.min_closed_frames {
            self.count += 1;
            true
        } else {
            false
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_eye_closed(&self) -> bool {
        self.closed_frames > 0
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.closed_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExpressionState::*;

    fn signals(ear: f32, mar: f32) -> SignalVector {
        SignalVector {
            ear_left: ear,
            ear_right: ear,
            ear_avg: ear,
            mar,
            smile_ratio: 0.3,
            brow_eye_dist: 30.0,
            lip_corner_drop: 0.0,
        }
    }

    fn classify_default(s: &SignalVector) -> ExpressionState {
        classify(s, &ExpressionThresholds::default())
    }

    #[test]
    fn test_neutral() {
        assert_eq!(classify_default(&signals(0.3, 0.05)), Neutral);
    }

    #[test]
    fn test_blink_beats_surprise() {
        // Closed eyes and a wide-open mouth at once
        assert_eq!(classify_default(&signals(0.05, 0.8)), Blinking);
    }

    #[test]
    fn test_surprise_beats_smile() {
        assert_eq!(classify_default(&signals(0.3, 0.7)), Surprised);
    }

    #[test]
    fn test_smile_band_edges() {
        assert_eq!(classify_default(&signals(0.3, 0.3)), Neutral);
        assert_eq!(classify_default(&signals(0.3, 0.31)), Smiling);
        // Upper edge is inclusive
        assert_eq!(classify_default(&signals(0.3, 0.5)), Smiling);
        assert_eq!(classify_default(&signals(0.3, 0.51)), Surprised);
    }

    #[test]
    fn test_sad_requires_margin() {
        let mut s = signals(0.3, 0.05);
        s.lip_corner_drop = 0.01;
        assert_eq!(classify_default(&s), Neutral);
        s.lip_corner_drop = 0.03;
        assert_eq!(classify_default(&s), SadOrCrying);
    }

    #[test]
    fn test_smile_beats_sad() {
        let mut s = signals(0.3, 0.4);
        s.lip_corner_drop = 0.05;
        assert_eq!(classify_default(&s), Smiling);
    }

    #[test]
    fn test_closed_smile_only_when_enabled() {
        let mut s = signals(0.3, 0.1);
        s.smile_ratio = 0.5;
        assert_eq!(classify_default(&s), Neutral);

        let thresholds = ExpressionThresholds {
            smile_ratio: Some(0.45),
            ..ExpressionThresholds::default()
        };
        assert_eq!(classify(&s, &thresholds), Smiling);
    }

    #[test]
    fn test_blink_counted_once_per_run() {
        let mut counter = BlinkCounter::default();
        assert!(!counter.observe(Blinking));
        assert!(counter.is_eye_closed());
        assert!(!counter.observe(Blinking));
        assert!(counter.observe(Neutral));
        assert_eq!(counter.count(), 1);
        assert!(!counter.is_eye_closed());
    }

    #[test]
    fn test_open_eyes_never_count() {
        let mut counter = BlinkCounter::default();
        for state in [Neutral, Smiling, Surprised, Neutral] {
            counter.observe(state);
        }
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_two_separate_blinks() {
        let mut counter = BlinkCounter::default();
        for state in [Blinking, Neutral, Neutral, Blinking, Smiling] {
            counter.observe(state);
        }
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_min_closed_frames_filters_flicker() {
        let mut counter = BlinkCounter::new(2);
        for state in [Blinking, Neutral] {
            counter.observe(state);
        }
        assert_eq!(counter.count(), 0);
        for state in [Blinking, Blinking, Neutral] {
            counter.observe(state);
        }
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_reset_clears_count_and_flag() {
        let mut counter = BlinkCounter::default();
        counter.observe(Blinking);
        counter.observe(Neutral);
        counter.observe(Blinking);
        counter.reset();
        assert_eq!(counter.count(), 0);
        assert!(!counter.is_eye_closed());
        // The closed run was discarded by the reset
        counter.observe(Neutral);
        assert_eq!(counter.count(), 0);
    }
}
