//! CLI handler for signing in ahead of time.

use crate::app;
use crate::auth::{DeviceCodeAuth, TokenProvider};
use crate::global;
use anyhow::{Context, Result};
use std::path::Path;

pub async fn handle_login_command(config_path: Option<&Path>) -> Result<()> {
    let config = app::load_config(config_path)?;
    let cache_path = global::token_cache_file()?;

    // Always allow the interactive flow here, whatever the service is set to.
    let mut auth = config.auth.clone();
    auth.interactive = true;

    let provider = DeviceCodeAuth::from_config(&auth, cache_path.clone())?;
    provider
        .acquire_token()
        .await
        .context("Sign-in failed")?;

    println!("Signed in. Token cached at {}", cache_path.display());
    Ok(())
}
