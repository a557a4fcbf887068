//! Passive liveness via landmark micro-motion.
//!
//! A static photograph or printed image produces near-identical landmark
//! geometry across consecutive frames. A live person breathes, blinks and
//! carries muscle tremor, so the positions of a few stable anchors relative
//! to the nose tip keep fluctuating even when the subject holds still.
//!
//! [`MotionHistory`] keeps a bounded window of nose-relative anchor positions
//! and reduces it to one motion score per frame: the mean per-axis standard
//! deviation of every anchor across the window, scaled by
//! [`MOTION_SCALE`]. Working relative to the nose tip makes the score
//! translation invariant, so sliding a photo across the frame does not read
//! as motion.
//!
//! # Threat Coverage
//!
//! - **Blocks:** printed photographs and still images on a screen, including
//!   ones moved around in front of the camera.
//! - **Does not block:** video replay (landmarks move in video) or masks.
//!   Those are left to the challenge-response protocol and texture fusion.

use std::collections::VecDeque;

use crate::landmarks::{LandmarkFrame, LandmarkLayout, Point, MOTION_ANCHOR_COUNT};

/// Score reported while the window holds fewer than `min_samples` entries.
/// Insufficient data is assumed live so warm-up never blocks a real user.
pub const INSUFFICIENT_DATA_SCORE: f64 = 99.0;

/// Multiplier that brings normalized-coordinate deviations to a human scale.
pub const MOTION_SCALE: f64 = 1000.0;

type Snapshot = [Point; MOTION_ANCHOR_COUNT];

/// Bounded FIFO of nose-relative anchor snapshots.
#[derive(Debug, Clone)]
pub struct MotionHistory {
    history: VecDeque<Snapshot>,
    capacity: usize,
    min_samples: usize,
}

impl MotionHistory {
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
            min_samples,
        }
    }

    /// Append the frame's anchor snapshot and return the updated score.
    pub fn update(&mut self, frame: &LandmarkFrame, layout: &LandmarkLayout) -> f64 {
        let nose = frame.point(layout.nose_tip).unwrap_or_default();
        let snapshot = layout.motion_anchors.map(|i| {
            let p = frame.point(i).unwrap_or_default();
            Point::new(p.x - nose.x, p.y - nose.y)
        });

        self.history.push_back(snapshot);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        self.score()
    }

    /// Motion score of the current window.
    pub fn score(&self) -> f64 {
        if self.history.len() < self.min_samples {
            return INSUFFICIENT_DATA_SCORE;
        }

        let mut total = 0.0f64;
        for anchor in 0..MOTION_ANCHOR_COUNT {
            total += axis_std(self.history.iter().map(|s| s[anchor].x));
            total += axis_std(self.history.iter().map(|s| s[anchor].y));
        }

        total / (MOTION_ANCHOR_COUNT * 2) as f64 * MOTION_SCALE
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all history (face lost or session reset).
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

/// Population standard deviation.
///
/// Values are shifted by the first sample before accumulating, so a constant
/// series yields exactly zero rather than rounding noise.
fn axis_std(values: impl Iterator<Item = f32> + Clone) -> f64 {
    let Some(first) = values.clone().next() else {
        return 0.0;
    };
    let shift = f64::from(first);

    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0f64, 0.0f64);
    for v in values {
        let d = f64::from(v) - shift;
        n += 1;
        sum += d;
        sum_sq += d * d;
    }

    let n = n as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{sway, SyntheticFace};

    fn history() -> MotionHistory {
        MotionHistory::new(30, 10)
    }

    #[test]
    fn test_warmup_returns_sentinel() {
        let mut h = history();
        let layout = LandmarkLayout::default();
        for i in 0..9 {
            // Wildly different frames still score the sentinel during warm-up
            let frame = SyntheticFace::new()
                .with_anchor_offsets(sway(i, 25.0))
                .frame();
            assert_eq!(h.update(&frame, &layout), INSUFFICIENT_DATA_SCORE);
        }
        assert_eq!(h.len(), 9);
    }

    #[test]
    fn test_static_face_scores_exactly_zero() {
        let mut h = history();
        let layout = LandmarkLayout::default();
        let frame = SyntheticFace::new().frame();
        let mut score = INSUFFICIENT_DATA_SCORE;
        for _ in 0..10 {
            score = h.update(&frame, &layout);
        }
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_translated_photo_scores_zero() {
        let mut h = history();
        let layout = LandmarkLayout::default();
        let mut score = INSUFFICIENT_DATA_SCORE;
        for i in 0..20 {
            // Whole-face translation only: relative geometry never changes
            let shift = i as f32 * 4.0;
            let frame = SyntheticFace::new().with_translation(shift, -shift).frame();
            score = h.update(&frame, &layout);
        }
        assert!(score < 1e-3, "score = {score}");
    }

    #[test]
    fn test_micro_motion_scores_above_static_threshold() {
        let mut h = history();
        let layout = LandmarkLayout::default();
        let mut score = 0.0;
        for i in 0..20 {
            let frame = SyntheticFace::new().with_anchor_offsets(sway(i, 3.0)).frame();
            score = h.update(&frame, &layout);
        }
        assert!(score > 1.5, "score = {score}");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut h = MotionHistory::new(5, 2);
        let layout = LandmarkLayout::default();
        let frame = SyntheticFace::new().frame();
        for _ in 0..12 {
            h.update(&frame, &layout);
        }
        assert_eq!(h.capacity(), 5);
        assert_eq!(h.len(), h.capacity());
    }

    #[test]
    fn test_old_motion_ages_out() {
        let mut h = MotionHistory::new(10, 10);
        let layout = LandmarkLayout::default();
        for i in 0..10 {
            let frame = SyntheticFace::new().with_anchor_offsets(sway(i, 3.0)).frame();
            h.update(&frame, &layout);
        }
        assert!(h.score() > 0.0);

        let still = SyntheticFace::new().frame();
        for _ in 0..10 {
            h.update(&still, &layout);
        }
        assert_eq!(h.score(), 0.0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut h = history();
        let layout = LandmarkLayout::default();
        let frame = SyntheticFace::new().frame();
        for _ in 0..15 {
            h.update(&frame, &layout);
        }
        h.reset();
        assert!(h.is_empty());
        assert_eq!(h.score(), INSUFFICIENT_DATA_SCORE);
    }

    #[test]
    fn test_axis_std_known_values() {
        // population std of [2, 4, 4, 4, 5, 5, 7, 9] is 2
        let values = [2.0f32, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let std = axis_std(values.iter().copied());
        assert!((std - 2.0).abs() < 1e-9);
    }
}
