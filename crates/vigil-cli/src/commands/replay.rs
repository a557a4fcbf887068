//! Run the liveness engine over a recorded landmark trace.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Serialize;
use vigil_core::trace::parse_trace;
use vigil_core::{
    ChallengePicker, ChallengeType, FrameEvent, FusedDecision, FusionGate, FusionReason,
    LivenessConfig, LivenessEngine, Outcome, RandomPicker, ScriptedPicker, StatusRecord, Verdict,
};

/// One line of replay output.
#[derive(Debug, Serialize)]
pub struct ReplayRecord {
    pub t: f64,
    pub status: StatusRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<FusedDecision>,
}

/// Verdict counts over a whole replay.
#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub frames: usize,
    pub rejected: usize,
    pub outcomes: BTreeMap<&'static str, usize>,
    pub passed: usize,
    pub failed: usize,
    pub fused: BTreeMap<&'static str, usize>,
}

impl ReplaySummary {
    fn record_result(&mut self, outcome: Outcome, verdict: Verdict) {
        *self.outcomes.entry(outcome.reason()).or_default() += 1;
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Fail => self.failed += 1,
        }
    }

    fn record_decision(&mut self, reason: FusionReason) {
        *self.fused.entry(reason.message()).or_default() += 1;
    }

    fn print(&self) {
        println!();
        println!("Frames: {} ({} rejected)", self.frames, self.rejected);
        println!(
            "Cycles: {} ({} passed, {} failed)",
            self.passed + self.failed,
            self.passed,
            self.failed
        );
        for (reason, count) in &self.outcomes {
            println!("  {reason}: {count}");
        }
        if !self.fused.is_empty() {
            println!("Fused decisions:");
            for (reason, count) in &self.fused {
                println!("  {reason}: {count}");
            }
        }
    }
}

/// Feed `events` through `engine`, handing every status to `emit`.
pub fn replay<P: ChallengePicker>(
    engine: &mut LivenessEngine<P>,
    events: &[FrameEvent],
    mut emit: impl FnMut(&ReplayRecord),
) -> ReplaySummary {
    let mut session = engine.new_session();
    let mut gate = FusionGate::new(Some(engine.config().fusion_accept_threshold));
    let mut summary = ReplaySummary::default();

    for (i, event) in events.iter().enumerate() {
        summary.frames += 1;
        let timestamp = match event.timestamp() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(frame = i, error = %e, "skipping frame");
                summary.rejected += 1;
                continue;
            }
        };

        let status = match engine.process(&mut session, event.frame().as_ref(), timestamp) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(frame = i, error = %e, "frame rejected");
                summary.rejected += 1;
                continue;
            }
        };

        if gate.observe(&status, event.texture) {
            if let Some(result) = &status.result {
                summary.record_result(result.outcome, result.verdict);
            }
            if let Some(d) = gate.decision() {
                summary.record_decision(d.reason);
            }
        }

        emit(&ReplayRecord {
            t: event.t,
            status,
            decision: gate.decision(),
        });
    }

    summary
}

fn build_engine(
    config: LivenessConfig,
    seed: Option<u64>,
    challenge: Option<ChallengeType>,
) -> anyhow::Result<LivenessEngine<Box<dyn ChallengePicker>>> {
    let picker: Box<dyn ChallengePicker> = match (challenge, seed) {
        (Some(challenge), _) => Box::new(ScriptedPicker::repeat(challenge)),
        (None, Some(seed)) => Box::new(RandomPicker::seeded(seed)),
        (None, None) => Box::new(RandomPicker::from_entropy()),
    };
    LivenessEngine::with_picker(config, picker).context("invalid engine config")
}

fn print_text(record: &ReplayRecord) {
    let s = &record.status;
    let expression = s.expression.map(|e| e.to_string()).unwrap_or_else(|| "-".into());
    let mut line = format!(
        "{:>8.3}s  {:<9}  motion {:>6.2}  blinks {:>2}  {:<9}  {}",
        record.t,
        format!("{:?}", s.state),
        s.motion_score,
        s.blink_count,
        expression,
        s.instruction_text,
    );
    if let Some(d) = &record.decision {
        line.push_str(&format!("  [fused: {:?}, {}]", d.verdict, d.reason.message()));
    }
    println!("{line}");
}

pub fn run(
    trace: PathBuf,
    config: Option<PathBuf>,
    seed: Option<u64>,
    challenge: Option<ChallengeType>,
    json: bool,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            LivenessConfig::from_toml_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => LivenessConfig::default(),
    };

    let text = std::fs::read_to_string(&trace)
        .with_context(|| format!("failed to read trace {}", trace.display()))?;
    let events = parse_trace(&text)
        .map_err(|(line, e)| anyhow!("{}:{line}: {e}", trace.display()))?;
    tracing::debug!(frames = events.len(), "trace loaded");

    let mut engine = build_engine(config, seed, challenge)?;
    let summary = replay(&mut engine, &events, |record| {
        if json {
            match serde_json::to_string(record) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode status"),
            }
        } else {
            print_text(record);
        }
    });

    if !json {
        summary.print();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::simulate::{generate, Scenario};
    use vigil_core::LivenessState;

    fn outcomes(
        scenario: Scenario,
        frames: usize,
        seed: Option<u64>,
        challenge: Option<ChallengeType>,
    ) -> (ReplaySummary, Vec<ReplayRecord>) {
        let events = generate(scenario, frames, 30.0, 4);
        let mut engine = build_engine(LivenessConfig::default(), seed, challenge).unwrap();
        let mut records = Vec::new();
        let summary = replay(&mut engine, &events, |r| {
            records.push(ReplayRecord {
                t: r.t,
                status: r.status.clone(),
                decision: r.decision,
            })
        });
        (summary, records)
    }

    #[test]
    fn test_live_scenario_passes() {
        let (summary, _) = outcomes(Scenario::Live, 600, Some(5), None);
        assert!(summary.passed >= 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.fused.get("Access granted"), Some(&summary.passed));
    }

    #[test]
    fn test_photo_scenario_fails_on_both_signals() {
        let (summary, records) = outcomes(Scenario::Photo, 300, Some(1), None);
        assert_eq!(summary.passed, 0);
        assert!(summary.failed >= 1);
        assert_eq!(summary.outcomes.get("Static image detected"), Some(&summary.failed));
        assert_eq!(summary.fused.get("Spoof detected (texture)"), Some(&summary.failed));
        assert!(records
            .iter()
            .all(|r| r.status.challenge_type.is_none()));
    }

    #[test]
    fn test_timeout_scenario() {
        let (summary, _) = outcomes(Scenario::Timeout, 300, None, Some(ChallengeType::Smile));
        assert_eq!(summary.passed, 0);
        assert_eq!(summary.outcomes.get("Challenge timed out"), Some(&1));
    }

    #[test]
    fn test_blink_scenario_with_blink_challenge() {
        let (summary, records) = outcomes(Scenario::BlinkPass, 300, None, Some(ChallengeType::Blink));
        assert!(summary.passed >= 1);
        assert_eq!(summary.failed, 0);
        assert!(records.iter().any(|r| r.status.blink_count > 0));
    }

    #[test]
    fn test_decision_held_through_result_phase() {
        let (_, records) = outcomes(Scenario::Photo, 120, Some(1), None);
        let in_result: Vec<_> = records
            .iter()
            .filter(|r| r.status.state == LivenessState::Result)
            .collect();
        assert!(!in_result.is_empty());
        assert!(in_result.iter().all(|r| r.decision.is_some()));
        assert!(records
            .iter()
            .filter(|r| r.status.state != LivenessState::Result)
            .all(|r| r.decision.is_none()));
    }
}
