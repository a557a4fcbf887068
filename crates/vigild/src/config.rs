use std::path::PathBuf;

use anyhow::{Context, Result};
use vigil_core::LivenessConfig;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine tuning: defaults, then the `VIGIL_CONFIG` file, then env overrides.
    pub liveness: LivenessConfig,
    /// Seed for challenge selection. OS entropy when unset.
    pub seed: Option<u64>,
    /// Landmark trace to read (default: stdin).
    pub input: Option<PathBuf>,
    /// Whether to fuse verdicts with the texture score carried by frames.
    pub fusion_enabled: bool,
    /// Emit logs as JSON instead of human-readable text.
    pub log_json: bool,
    /// Capacity of the request and update channels.
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from `VIGIL_*` environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an explicit variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut liveness = match var("VIGIL_CONFIG") {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                LivenessConfig::from_toml_str(&text)
                    .with_context(|| format!("invalid config file {path}"))?
            }
            None => LivenessConfig::default(),
        };

        liveness.static_threshold =
            env_f64(&var, "VIGIL_STATIC_THRESHOLD", liveness.static_threshold);
        liveness.challenge_limit_seconds = env_f64(
            &var,
            "VIGIL_CHALLENGE_LIMIT_SECS",
            liveness.challenge_limit_seconds,
        );
        liveness.result_hold_seconds =
            env_f64(&var, "VIGIL_RESULT_HOLD_SECS", liveness.result_hold_seconds);
        liveness
            .validate()
            .context("invalid liveness settings after environment overrides")?;

        Ok(Self {
            liveness,
            seed: var("VIGIL_SEED").and_then(|v| v.parse().ok()),
            input: var("VIGIL_INPUT").map(PathBuf::from),
            fusion_enabled: var("VIGIL_FUSION_ENABLED")
                .map(|v| v != "0")
                .unwrap_or(true),
            log_json: var("VIGIL_LOG_JSON").map(|v| v != "0").unwrap_or(false),
            channel_capacity: env_usize(&var, "VIGIL_CHANNEL_CAPACITY", 64).max(1),
        })
    }
}

fn env_f64(var: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(var: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
