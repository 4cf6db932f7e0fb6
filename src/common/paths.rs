use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "REMOVESILENCE_CONFIG";

/// Get the removesilence config directory
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("removesilence");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

pub fn config_file() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.toml"))
}
