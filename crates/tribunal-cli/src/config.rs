//! Configuration loading for the `tribunal` binary.
//!
//! The config file is YAML deserialized straight into
//! [`tribunal_api::state::AppConfig`]; every field has a default, so an
//! empty file (or no file at all) yields a working local setup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use tribunal_api::state::AppConfig;

/// Arguments for `tribunal config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the YAML configuration file to check.
    pub path: PathBuf,
}

/// Load the application config from a YAML file, or defaults when absent.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => AppConfig::default(),
    };
    config
        .schedule_rule
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid scheduling rule: {e}"))?;
    Ok(config)
}

/// `tribunal config <path>` — parse and validate, then report the outcome.
pub fn run_config(args: &ConfigArgs) -> anyhow::Result<u8> {
    let config = load_config(Some(&args.path))?;
    println!(
        "config ok: bind {}, grace {}s, reschedule window {}d",
        config.bind_addr, config.grace_seconds, config.schedule_rule.window_days
    );
    Ok(0)
}
