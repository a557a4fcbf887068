use thiserror::Error;

/// Reasons a landmark frame is rejected before it reaches the state machine.
///
/// A rejected frame is a no-op: the session and motion history keep their
/// previous values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("frame has zero pixel dimensions ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("frame has {got} landmarks, layout needs at least {needed}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("malformed trace line: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp {0} (must be finite and non-negative)")]
    Timestamp(f64),
}
