//! Scalar facial signals derived from a single landmark frame.
//!
//! Every function here is pure. Ratios are computed in pixel space so that a
//! non-square sensor does not stretch horizontal against vertical spans, and
//! a zero-length horizontal span yields 0 instead of a division by zero. A
//! degenerate eye is therefore indistinguishable from a fully closed one.

use serde::{Deserialize, Serialize};

use crate::landmarks::{LandmarkFrame, LandmarkLayout, Point};

/// Per-frame signal vector. No identity beyond the frame it was computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalVector {
    pub ear_left: f32,
    pub ear_right: f32,
    pub ear_avg: f32,
    pub mar: f32,
    pub smile_ratio: f32,
    /// Pixel distance between the brow point and its reference eye point.
    pub brow_eye_dist: f32,
    /// How far both mouth corners sit below the mouth-center baseline, in
    /// normalized units. Signed: negative when a corner sits above it.
    pub lip_corner_drop: f32,
}

/// Eye aspect ratio of a 6-point eye contour.
///
/// `(|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)`
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f32 {
    let horizontal = eye[0].distance(eye[3]);
    if horizontal == 0.0 {
        return 0.0;
    }
    let vertical = eye[1].distance(eye[5]) + eye[2].distance(eye[4]);
    vertical / (2.0 * horizontal)
}

/// Mouth aspect ratio: lip separation over mouth-corner width.
pub fn mouth_aspect_ratio(left: Point, right: Point, upper: Point, lower: Point) -> f32 {
    let width = left.distance(right);
    if width == 0.0 {
        return 0.0;
    }
    upper.distance(lower) / width
}

/// Mouth width relative to face width.
pub fn smile_ratio(mouth_left: Point, mouth_right: Point, face_left: Point, face_right: Point) -> f32 {
    let face_width = face_left.distance(face_right);
    if face_width == 0.0 {
        return 0.0;
    }
    mouth_left.distance(mouth_right) / face_width
}

fn eye_contour(frame: &LandmarkFrame, indices: &[usize; 6]) -> [Point; 6] {
    indices.map(|i| frame.to_pixels(i))
}

fn lip_corner_drop(frame: &LandmarkFrame, layout: &LandmarkLayout) -> f32 {
    let y = |i| frame.point(i).unwrap_or_default().y;
    let baseline = (y(layout.outer_lip_upper) + y(layout.outer_lip_lower)) / 2.0;
    let left = y(layout.mouth_left) - baseline;
    let right = y(layout.mouth_right) - baseline;
    left.min(right)
}

/// Compute the full signal vector for one frame.
pub fn extract(frame: &LandmarkFrame, layout: &LandmarkLayout) -> SignalVector {
    let ear_left = eye_aspect_ratio(&eye_contour(frame, &layout.left_eye));
    let ear_right = eye_aspect_ratio(&eye_contour(frame, &layout.right_eye));

    let mouth_left = frame.to_pixels(layout.mouth_left);
    let mouth_right = frame.to_pixels(layout.mouth_right);

    SignalVector {
        ear_left,
        ear_right,
        ear_avg: (ear_left + ear_right) / 2.0,
        mar: mouth_aspect_ratio(
            mouth_left,
            mouth_right,
            frame.to_pixels(layout.inner_lip_upper),
            frame.to_pixels(layout.inner_lip_lower),
        ),
        smile_ratio: smile_ratio(
            mouth_left,
            mouth_right,
            frame.to_pixels(layout.face_left),
            frame.to_pixels(layout.face_right),
        ),
        brow_eye_dist: frame
            .to_pixels(layout.brow)
            .distance(frame.to_pixels(layout.brow_reference)),
        lip_corner_drop: lip_corner_drop(frame, layout),
    }
}
