use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "meetlight";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .context("Unable to determine config directory")
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn token_cache_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("token_cache.json"))
}
