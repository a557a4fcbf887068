//! Challenge types and the source that picks them.
//!
//! Challenge selection is injected into the state machine through
//! [`ChallengePicker`] so callers decide where randomness comes from: a
//! seeded [`RandomPicker`] for reproducible runs, OS entropy in production,
//! or a [`ScriptedPicker`] when the sequence must be fixed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::expression::ExpressionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    Smile,
    Surprise,
    Blink,
}

impl ChallengeType {
    pub const ALL: [ChallengeType; 3] = [Self::Smile, Self::Surprise, Self::Blink];

    /// Expression that satisfies this challenge.
    ///
    /// A blink challenge is met by a single closed-eye frame, not by the
    /// debounced blink counter.
    pub fn required_expression(self) -> ExpressionState {
        match self {
            Self::Smile => ExpressionState::Smiling,
            Self::Surprise => ExpressionState::Surprised,
            Self::Blink => ExpressionState::Blinking,
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            Self::Smile => "please smile",
            Self::Surprise => "show surprise",
            Self::Blink => "blink your eyes",
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Smile => "smile",
            Self::Surprise => "surprise",
            Self::Blink => "blink",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for ChallengeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smile" => Ok(Self::Smile),
            "surprise" => Ok(Self::Surprise),
            "blink" => Ok(Self::Blink),
            other => Err(format!(
                "unknown challenge '{other}' (expected smile, surprise or blink)"
            )),
        }
    }
}

/// Source of challenges for the state machine.
pub trait ChallengePicker {
    fn pick(&mut self) -> ChallengeType;
}

impl<P: ChallengePicker + ?Sized> ChallengePicker for Box<P> {
    fn pick(&mut self) -> ChallengeType {
        (**self).pick()
    }
}

/// Uniform choice over [`ChallengeType::ALL`].
#[derive(Debug, Clone)]
pub struct RandomPicker<R> {
    rng: R,
}

impl<R: Rng> RandomPicker<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomPicker<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> ChallengePicker for RandomPicker<R> {
    fn pick(&mut self) -> ChallengeType {
        ChallengeType::ALL[self.rng.gen_range(0..ChallengeType::ALL.len())]
    }
}

/// Cycles through a fixed list of challenges.
#[derive(Debug, Clone)]
pub struct ScriptedPicker {
    script: Vec<ChallengeType>,
    next: usize,
}

impl ScriptedPicker {
    /// An empty script always yields [`ChallengeType::Blink`].
    pub fn new(script: impl IntoIterator<Item = ChallengeType>) -> Self {
        Self {
            script: script.into_iter().collect(),
            next: 0,
        }
    }

    pub fn repeat(challenge: ChallengeType) -> Self {
        Self::new([challenge])
    }
}

impl ChallengePicker for ScriptedPicker {
    fn pick(&mut self) -> ChallengeType {
        if self.script.is_empty() {
            return ChallengeType::Blink;
        }
        let challenge = self.script[self.next % self.script.len()];
        self.next = self.next.wrapping_add(1);
        challenge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_required_expressions() {
        assert_eq!(ChallengeType::Smile.required_expression(), ExpressionState::Smiling);
        assert_eq!(ChallengeType::Surprise.required_expression(), ExpressionState::Surprised);
        assert_eq!(ChallengeType::Blink.required_expression(), ExpressionState::Blinking);
    }

    #[test]
    fn test_seeded_picker_is_reproducible() {
        let mut a = RandomPicker::seeded(42);
        let mut b = RandomPicker::seeded(42);
        let seq_a: Vec<_> = (0..50).map(|_| a.pick()).collect();
        let seq_b: Vec<_> = (0..50).map(|_| b.pick()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_random_picker_covers_all_challenges() {
        let mut picker = RandomPicker::seeded(7);
        let seen: HashSet<_> = (0..300).map(|_| picker.pick()).collect();
        assert_eq!(seen.len(), ChallengeType::ALL.len());
    }

    #[test]
    fn test_scripted_picker_cycles() {
        let mut picker = ScriptedPicker::new([ChallengeType::Smile, ChallengeType::Blink]);
        assert_eq!(picker.pick(), ChallengeType::Smile);
        assert_eq!(picker.pick(), ChallengeType::Blink);
        assert_eq!(picker.pick(), ChallengeType::Smile);
    }

    #[test]
    fn test_empty_script_defaults_to_blink() {
        let mut picker = ScriptedPicker::new(Vec::new());
        assert_eq!(picker.pick(), ChallengeType::Blink);
    }

    #[test]
    fn test_boxed_picker() {
        let mut picker: Box<dyn ChallengePicker> = Box::new(ScriptedPicker::repeat(ChallengeType::Surprise));
        assert_eq!(picker.pick(), ChallengeType::Surprise);
    }

    #[test]
    fn test_parse_challenge() {
        assert_eq!("Blink".parse::<ChallengeType>().unwrap(), ChallengeType::Blink);
        assert!("wink".parse::<ChallengeType>().is_err());
    }
}
