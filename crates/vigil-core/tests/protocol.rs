use std::time::Duration;

use vigil_core::synthetic::{sway, SyntheticFace};
use vigil_core::{
    fuse, ChallengeType, FrameEvent, FusionReason, LivenessConfig, LivenessEngine, LivenessState,
    Outcome, StatusRecord, Verdict,
};

const FPS: u64 = 25;

fn at(frame: u64) -> Duration {
    Duration::from_millis(frame * 1000 / FPS)
}

/// A cooperative user: moves slightly all the time and performs whatever
/// challenge is shown.
fn respond(i: u64, challenge: Option<ChallengeType>) -> SyntheticFace {
    let face = SyntheticFace::new().with_anchor_offsets(sway(i as usize, 3.0));
    match challenge {
        Some(ChallengeType::Smile) => face.with_mouth_aspect(0.4),
        Some(ChallengeType::Surprise) => face.with_mouth_aspect(0.7),
        Some(ChallengeType::Blink) => face.with_eye_aspect(0.1),
        None => face,
    }
}

#[test]
fn cooperative_user_passes_every_cycle() {
    let mut engine = LivenessEngine::seeded(LivenessConfig::default(), 2024).unwrap();
    let mut session = engine.new_session();

    let mut verdicts = Vec::new();
    let mut last: Option<StatusRecord> = None;
    for i in 0..600 {
        let challenge = last
            .as_ref()
            .filter(|s| s.state == LivenessState::Challenge)
            .and_then(|s| s.challenge_type);
        let frame = respond(i, challenge).frame();
        let status = engine.process(&mut session, Some(&frame), at(i)).unwrap();

        let entered_result = status.state == LivenessState::Result
            && last.as_ref().map(|s| s.state) != Some(LivenessState::Result);
        if entered_result {
            verdicts.push(status.result.clone().unwrap());
        }
        last = Some(status);
    }

    // 20 warm-up + analysis + challenge + 3 s hold per cycle: several cycles
    assert!(verdicts.len() >= 3, "only {} cycles", verdicts.len());
    for result in &verdicts {
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.outcome, Outcome::AccessGranted);
    }
}

#[test]
fn replayed_photo_never_passes() {
    let mut engine = LivenessEngine::seeded(LivenessConfig::default(), 7).unwrap();
    let mut session = engine.new_session();

    let photo = SyntheticFace::new().with_mouth_aspect(0.4);
    let mut outcomes = Vec::new();
    for i in 0..300 {
        // A photo slid slowly across the frame
        let shift = (i % 50) as f32;
        let frame = photo.clone().with_translation(shift, shift / 2.0).frame();
        let status = engine.process(&mut session, Some(&frame), at(i)).unwrap();
        if session.result_started_at() == Some(at(i)) {
            outcomes.extend(status.result.map(|r| r.outcome));
        }
    }

    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().all(|o| *o == Outcome::StaticImage));
}

#[test]
fn trace_replay_matches_direct_processing() {
    let config = LivenessConfig::default();
    let mut direct = LivenessEngine::seeded(config.clone(), 99).unwrap();
    let mut replayed = LivenessEngine::seeded(config, 99).unwrap();
    let mut a = direct.new_session();
    let mut b = replayed.new_session();

    for i in 0..240u64 {
        // Binary-fraction timestamps survive the decimal text form exactly
        let t = i as f64 / 32.0;
        let frame = (i != 60).then(|| respond(i, None).frame());
        let event = match &frame {
            Some(f) => FrameEvent::face(t, f),
            None => FrameEvent::face_lost(t, 640, 480),
        };
        let line = event.to_line().unwrap();
        let parsed = FrameEvent::parse_line(&line).unwrap();

        let expected = direct
            .process(&mut a, frame.as_ref(), Duration::from_secs_f64(t))
            .unwrap();
        let got = replayed
            .process(&mut b, parsed.frame().as_ref(), parsed.timestamp().unwrap())
            .unwrap();
        assert_eq!(got.state, expected.state, "frame {i}");
        assert_eq!(got.challenge_type, expected.challenge_type, "frame {i}");
    }
}

#[test]
fn fusion_blocks_screen_replay_that_fools_behavior() {
    let mut engine = LivenessEngine::seeded(LivenessConfig::default(), 3).unwrap();
    let mut session = engine.new_session();

    let mut result = None;
    let mut challenge = None;
    for i in 0..200 {
        let status = engine
            .process(&mut session, Some(&respond(i, challenge).frame()), at(i))
            .unwrap();
        challenge = status.challenge_type;
        if let Some(r) = status.result {
            result = Some(r);
            break;
        }
    }
    let result = result.unwrap();
    assert_eq!(result.verdict, Verdict::Pass);

    let threshold = engine.config().fusion_accept_threshold;
    assert_eq!(fuse(0.2, &result, threshold).reason, FusionReason::Texture);
    assert_eq!(fuse(0.95, &result, threshold).verdict, Verdict::Pass);
}
