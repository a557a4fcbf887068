//! Landmark frames and the index layout the engine reads from them.
//!
//! The external landmark provider delivers an ordered point set in normalized
//! `[0, 1]` coordinates together with the pixel size of the source image. The
//! engine never assumes a particular provider: every index it touches is named
//! in a [`LandmarkLayout`], with [`LandmarkLayout::mediapipe`] as the default
//! for the dense 468-point face mesh.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Number of points in the dense face mesh.
pub const MESH_POINT_COUNT: usize = 468;

/// Number of motion anchors tracked by the motion history.
pub const MOTION_ANCHOR_COUNT: usize = 4;

/// A 2D landmark position. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// One frame of facial landmarks from the external provider.
///
/// Frames are immutable once built. Validation is separate from construction
/// so a provider can hand over whatever it produced and let the engine decide
/// whether to reject it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    points: Vec<Point>,
    width: u32,
    height: u32,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Point>, width: u32, height: u32) -> Self {
        Self {
            points,
            width,
            height,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Normalized position of landmark `index`, if present.
    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// Landmark `index` in absolute pixel coordinates.
    ///
    /// Missing indices map to the origin; callers that need a guarantee run
    /// [`LandmarkFrame::validate`] first.
    pub fn to_pixels(&self, index: usize) -> Point {
        let p = self.point(index).unwrap_or_default();
        Point::new(p.x * self.width as f32, p.y * self.height as f32)
    }

    /// Check that the frame can be processed with `layout`.
    pub fn validate(&self, layout: &LandmarkLayout) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let needed = layout.max_index() + 1;
        if self.points.len() < needed {
            return Err(FrameError::TooFewPoints {
                needed,
                got: self.points.len(),
            });
        }

        if let Some(index) = self.points.iter().position(|p| !p.is_finite()) {
            return Err(FrameError::NonFinite { index });
        }

        Ok(())
    }
}

/// Landmark indices used by the signal extractor and the motion history.
///
/// Eye contours follow the 6-point convention: index 0 is one horizontal
/// corner, 1–2 are the upper lid, 3 is the opposite corner, 4–5 are the lower
/// lid, so that `(1, 5)` and `(2, 4)` form the two vertical pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkLayout {
    pub left_eye: [usize; 6],
    pub right_eye: [usize; 6],
    pub mouth_left: usize,
    pub mouth_right: usize,
    pub inner_lip_upper: usize,
    pub inner_lip_lower: usize,
    pub outer_lip_upper: usize,
    pub outer_lip_lower: usize,
    pub face_left: usize,
    pub face_right: usize,
    pub brow: usize,
    pub brow_reference: usize,
    /// Reference point for translation-invariant motion (nose tip).
    pub nose_tip: usize,
    pub motion_anchors: [usize; MOTION_ANCHOR_COUNT],
}

impl LandmarkLayout {
    /// Indices for the MediaPipe 468-point face mesh.
    pub fn mediapipe() -> Self {
        Self {
            left_eye: [362, 385, 387, 263, 373, 380],
            right_eye: [33, 160, 158, 133, 153, 144],
            mouth_left: 61,
            mouth_right: 291,
            inner_lip_upper: 13,
            inner_lip_lower: 14,
            outer_lip_upper: 0,
            outer_lip_lower: 17,
            face_left: 234,
            face_right: 454,
            brow: 105,
            brow_reference: 373,
            nose_tip: 1,
            // nose tip, right eye outer corner, left eye outer corner, chin
            motion_anchors: [1, 33, 263, 152],
        }
    }

    /// Highest landmark index referenced by this layout.
    pub fn max_index(&self) -> usize {
        let singles = [
            self.mouth_left,
            self.mouth_right,
            self.inner_lip_upper,
            self.inner_lip_lower,
            self.outer_lip_upper,
            self.outer_lip_lower,
            self.face_left,
            self.face_right,
            self.brow,
            self.brow_reference,
            self.nose_tip,
        ];
        self.left_eye
            .iter()
            .chain(&self.right_eye)
            .chain(&self.motion_anchors)
            .chain(&singles)
            .copied()
            .max()
            .unwrap_or(0)
    }
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self::mediapipe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(width: u32, height: u32) -> LandmarkFrame {
        LandmarkFrame::new(vec![Point::new(0.5, 0.5); MESH_POINT_COUNT], width, height)
    }

    #[test]
    fn test_mediapipe_layout_fits_mesh() {
        assert!(LandmarkLayout::mediapipe().max_index() < MESH_POINT_COUNT);
    }

    #[test]
    fn test_valid_frame_accepted() {
        assert!(mesh(640, 480).validate(&LandmarkLayout::default()).is_ok());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let err = mesh(0, 480).validate(&LandmarkLayout::default()).unwrap_err();
        assert_eq!(
            err,
            FrameError::ZeroDimensions {
                width: 0,
                height: 480
            }
        );
    }

    #[test]
    fn test_short_frame_rejected() {
        let frame = LandmarkFrame::new(vec![Point::new(0.5, 0.5); 100], 640, 480);
        let err = frame.validate(&LandmarkLayout::default()).unwrap_err();
        assert!(matches!(err, FrameError::TooFewPoints { got: 100, .. }));
    }

    #[test]
    fn test_nan_rejected() {
        let mut points = vec![Point::new(0.5, 0.5); MESH_POINT_COUNT];
        points[42].y = f32::NAN;
        let frame = LandmarkFrame::new(points, 640, 480);
        let err = frame.validate(&LandmarkLayout::default()).unwrap_err();
        assert_eq!(err, FrameError::NonFinite { index: 42 });
    }

    #[test]
    fn test_pixel_conversion() {
        let mut points = vec![Point::default(); MESH_POINT_COUNT];
        points[1] = Point::new(0.25, 0.5);
        let frame = LandmarkFrame::new(points, 640, 480);
        assert_eq!(frame.to_pixels(1), Point::new(160.0, 240.0));
        // Missing index falls back to the origin
        assert_eq!(frame.to_pixels(10_000), Point::default());
    }

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&Point::new(0.5, 0.25)).unwrap();
        assert_eq!(json, "[0.5,0.25]");
        let back: Point = serde_json::from_str("[0.1,0.2]").unwrap();
        assert_eq!(back, Point::new(0.1, 0.2));
    }
}
