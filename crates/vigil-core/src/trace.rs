//! Landmark trace wire format.
//!
//! A trace is a JSON-lines stream with one [`FrameEvent`] per line:
//!
//! ```text
//! {"t":0.033,"width":640,"height":480,"points":[[0.41,0.52],...],"texture":0.93}
//! {"t":0.066,"width":640,"height":480}
//! ```
//!
//! A line without `points` (or with `"points": null`) is a face-lost frame.
//! `texture` is the optional probability from an external texture model.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::landmarks::{LandmarkFrame, Point};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Seconds since the start of the stream.
    pub t: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<f32>,
}

impl FrameEvent {
    /// Event carrying a detected face.
    pub fn face(t: f64, frame: &LandmarkFrame) -> Self {
        Self {
            t,
            width: frame.width(),
            height: frame.height(),
            points: Some(frame.points().to_vec()),
            texture: None,
        }
    }

    /// Event for a frame in which no face was found.
    pub fn face_lost(t: f64, width: u32, height: u32) -> Self {
        Self {
            t,
            width,
            height,
            points: None,
            texture: None,
        }
    }

    pub fn with_texture(mut self, score: f32) -> Self {
        self.texture = Some(score);
        self
    }

    pub fn parse_line(line: &str) -> Result<Self, TraceError> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn to_line(&self) -> Result<String, TraceError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Frame timestamp as a duration since stream start.
    pub fn timestamp(&self) -> Result<Duration, TraceError> {
        Duration::try_from_secs_f64(self.t).map_err(|_| TraceError::Timestamp(self.t))
    }

    /// The landmark frame, or `None` for a face-lost event.
    pub fn frame(&self) -> Option<LandmarkFrame> {
        self.points
            .as_ref()
            .map(|points| LandmarkFrame::new(points.clone(), self.width, self.height))
    }
}

/// Parse every non-blank line of a trace, tagging failures with their
/// 1-based line number.
pub fn parse_trace(text: &str) -> Result<Vec<FrameEvent>, (usize, TraceError)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| FrameEvent::parse_line(line).map_err(|e| (i + 1, e)))
        .collect()
}
