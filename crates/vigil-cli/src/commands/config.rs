//! Print the default engine configuration.

use anyhow::Context;
use vigil_core::LivenessConfig;

pub fn run() -> anyhow::Result<()> {
    let text = LivenessConfig::default()
        .to_toml_string()
        .context("failed to encode default config")?;
    print!("{text}");
    Ok(())
}
