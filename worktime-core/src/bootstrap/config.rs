//! Configuration loading

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::Config;

/// Load and validate configuration
///
/// Config file search order:
/// 1. `explicit_path` (from the command line)
/// 2. `WORKTIME_CONFIG_PATH` environment variable
/// 3. `./config.yaml`
/// 4. Environment variables only
pub fn load_config(explicit_path: Option<&str>) -> Result<Config> {
    let config_path = explicit_path
        .map(str::to_string)
        .or_else(|| std::env::var("WORKTIME_CONFIG_PATH").ok())
        .or_else(|| Path::new("config.yaml").exists().then(|| "config.yaml".to_string()));

    let config = match &config_path {
        Some(path) => {
            if !Path::new(path).exists() {
                anyhow::bail!("Config file {path} does not exist");
            }
            Config::from_file(path).with_context(|| format!("Failed to load {path}"))?
        }
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        anyhow::bail!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        );
    }

    info!(
        source = config_path.as_deref().unwrap_or("environment"),
        http_address = %config.http_address(),
        "Configuration loaded"
    );

    Ok(config)
}
