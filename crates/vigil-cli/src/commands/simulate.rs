//! Generate synthetic landmark traces.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vigil_core::synthetic::{sway, SyntheticFace};
use vigil_core::FrameEvent;

/// Amplitude of the breathing/tremor sway, in pixels.
const SWAY_PX: f32 = 2.5;
/// Per-anchor random jitter added on top of the sway, in pixels.
const JITTER_PX: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// A live person cycling through smile, surprise and blink
    Live,
    /// A printed photo drifting slowly in front of the camera
    Photo,
    /// A live person who only blinks
    BlinkPass,
    /// A live person who never reacts to the challenge
    Timeout,
}

impl Scenario {
    fn face(self, i: usize, rng: &mut StdRng) -> SyntheticFace {
        if self == Self::Photo {
            let drift = (i % 90) as f32 * 0.5;
            return SyntheticFace::new().with_translation(drift, drift * 0.3);
        }

        let mut offsets = sway(i, SWAY_PX);
        for (dx, dy) in offsets.iter_mut() {
            *dx += rng.gen_range(-JITTER_PX..JITTER_PX);
            *dy += rng.gen_range(-JITTER_PX..JITTER_PX);
        }
        let face = SyntheticFace::new().with_anchor_offsets(offsets);

        match self {
            Self::Live => match (i / 15) % 4 {
                1 => face.with_mouth_aspect(0.4),
                2 => face.with_mouth_aspect(0.7),
                3 if i % 15 < 3 => face.with_eye_aspect(0.1),
                _ => face,
            },
            Self::BlinkPass if i % 20 < 3 => face.with_eye_aspect(0.1),
            _ => face,
        }
    }

    fn texture(self, rng: &mut StdRng) -> f32 {
        let base = if self == Self::Photo { 0.15 } else { 0.85 };
        base + rng.gen_range(0.0..0.1)
    }
}

/// Build a trace of `frames` events spaced at `fps`.
pub fn generate(scenario: Scenario, frames: usize, fps: f64, seed: u64) -> Vec<FrameEvent> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..frames)
        .map(|i| {
            let frame = scenario.face(i, &mut rng).frame();
            let texture = scenario.texture(&mut rng);
            FrameEvent::face(i as f64 / fps, &frame).with_texture(texture)
        })
        .collect()
}

pub fn run(
    scenario: Scenario,
    frames: usize,
    fps: f64,
    seed: u64,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if !fps.is_finite() || fps <= 0.0 {
        bail!("--fps must be a positive number, got {fps}");
    }

    let events = generate(scenario, frames, fps, seed);

    let mut out: Box<dyn Write> = match &output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };

    for event in &events {
        let line = event.to_line()?;
        writeln!(out, "{line}").context("failed to write trace")?;
    }
    out.flush().context("failed to flush trace")?;

    if let Some(path) = output {
        eprintln!(
            "wrote {} frames ({:?}) to {}",
            events.len(),
            scenario,
            path.display()
        );
    }
    Ok(())
}
