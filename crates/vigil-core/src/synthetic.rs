//! Synthetic face-mesh frames with controllable geometry.
//!
//! Produces a full 468-point frame in the [`LandmarkLayout::mediapipe`] index
//! layout. Only the indices the engine reads carry real geometry; every other
//! point sits at the nose tip. Geometry is laid out in pixels on the target
//! frame and then normalized, so ratios come out exactly as requested:
//! each eye is 40 px wide, the face is 200 px wide.

use crate::landmarks::{LandmarkFrame, LandmarkLayout, Point, MESH_POINT_COUNT, MOTION_ANCHOR_COUNT};

const EYE_WIDTH: f32 = 40.0;
const EYE_Y: f32 = 200.0;
const MOUTH_Y: f32 = 300.0;
const CENTER_X: f32 = 320.0;
const OUTER_LIP_MARGIN: f32 = 4.0;

/// Builder for a single synthetic face frame.
#[derive(Debug, Clone)]
pub struct SyntheticFace {
    width: u32,
    height: u32,
    eye_aspect: f32,
    mouth_aspect: f32,
    mouth_width: f32,
    corner_drop: f32,
    anchor_offsets: [(f32, f32); MOTION_ANCHOR_COUNT],
    translation: (f32, f32),
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticFace {
    /// A neutral, open-eyed face on a 640×480 frame.
    pub fn new() -> Self {
        Self {
            width: 640,
            height: 480,
            eye_aspect: 0.3,
            mouth_aspect: 0.05,
            mouth_width: 60.0,
            corner_drop: 0.0,
            anchor_offsets: [(0.0, 0.0); MOTION_ANCHOR_COUNT],
            translation: (0.0, 0.0),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Eye aspect ratio applied to both eyes.
    pub fn with_eye_aspect(mut self, ear: f32) -> Self {
        self.eye_aspect = ear;
        self
    }

    /// Inner-lip mouth aspect ratio.
    pub fn with_mouth_aspect(mut self, mar: f32) -> Self {
        self.mouth_aspect = mar;
        self
    }

    /// Mouth-corner distance in pixels (face width is 200 px).
    pub fn with_mouth_width(mut self, px: f32) -> Self {
        self.mouth_width = px;
        self
    }

    /// Lower both mouth corners by `px` below the lip center.
    pub fn with_corner_drop(mut self, px: f32) -> Self {
        self.corner_drop = px;
        self
    }

    /// Pixel offsets for the four motion anchor regions, in anchor order:
    /// nose tip, right eye, left eye, chin. Eyes move as rigid groups so the
    /// eye aspect ratio is unaffected.
    pub fn with_anchor_offsets(mut self, offsets: [(f32, f32); MOTION_ANCHOR_COUNT]) -> Self {
        self.anchor_offsets = offsets;
        self
    }

    /// Translate the whole face, e.g. a photo moved in front of the camera.
    pub fn with_translation(mut self, dx: f32, dy: f32) -> Self {
        self.translation = (dx, dy);
        self
    }

    pub fn frame(&self) -> LandmarkFrame {
        let layout = LandmarkLayout::mediapipe();
        let [nose_off, right_off, left_off, chin_off] = self.anchor_offsets;

        let nose = (CENTER_X + nose_off.0, 250.0 + nose_off.1);
        let mut px = vec![nose; MESH_POINT_COUNT];

        let h = self.eye_aspect * EYE_WIDTH / 2.0;
        place_eye(&mut px, &layout.right_eye, 260.0, right_off, h);
        place_eye(&mut px, &layout.left_eye, 340.0, left_off, h);

        let half_mouth = self.mouth_width / 2.0;
        let half_gap = self.mouth_aspect * self.mouth_width / 2.0;
        px[layout.mouth_left] = (CENTER_X - half_mouth, MOUTH_Y + self.corner_drop);
        px[layout.mouth_right] = (CENTER_X + half_mouth, MOUTH_Y + self.corner_drop);
        px[layout.inner_lip_upper] = (CENTER_X, MOUTH_Y - half_gap);
        px[layout.inner_lip_lower] = (CENTER_X, MOUTH_Y + half_gap);
        px[layout.outer_lip_upper] = (CENTER_X, MOUTH_Y - half_gap - OUTER_LIP_MARGIN);
        px[layout.outer_lip_lower] = (CENTER_X, MOUTH_Y + half_gap + OUTER_LIP_MARGIN);

        px[layout.face_left] = (220.0, 240.0);
        px[layout.face_right] = (420.0, 240.0);
        px[layout.brow] = (280.0, 170.0);
        px[layout.motion_anchors[3]] = (CENTER_X + chin_off.0, 360.0 + chin_off.1);

        let (w, h) = (self.width as f32, self.height as f32);
        let (tx, ty) = self.translation;
        let points = px
            .into_iter()
            .map(|(x, y)| Point::new((x + tx) / w, (y + ty) / h))
            .collect();

        LandmarkFrame::new(points, self.width, self.height)
    }
}

fn place_eye(px: &mut [(f32, f32)], eye: &[usize; 6], left_x: f32, offset: (f32, f32), h: f32) {
    let (dx, dy) = offset;
    let x = |v: f32| left_x + v + dx;
    let y = |v: f32| EYE_Y + v + dy;
    px[eye[0]] = (x(0.0), y(0.0));
    px[eye[1]] = (x(13.0), y(-h));
    px[eye[2]] = (x(27.0), y(-h));
    px[eye[3]] = (x(EYE_WIDTH), y(0.0));
    px[eye[4]] = (x(27.0), y(h));
    px[eye[5]] = (x(13.0), y(h));
}

/// Deterministic per-anchor micro-motion for frame `index`.
///
/// Each anchor follows its own phase-shifted oscillation, so positions
/// relative to the nose tip keep changing from frame to frame.
pub fn sway(index: usize, amplitude_px: f32) -> [(f32, f32); MOTION_ANCHOR_COUNT] {
    let t = index as f32 * 0.9;
    let mut offsets = [(0.0, 0.0); MOTION_ANCHOR_COUNT];
    for (k, offset) in offsets.iter_mut().enumerate() {
        let phase = t + k as f32 * 1.7;
        *offset = (
            amplitude_px * phase.sin(),
            amplitude_px * (phase * 1.3 + k as f32).cos(),
        );
    }
    offsets
}
