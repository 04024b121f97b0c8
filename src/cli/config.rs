//! CLI handler for inspecting the configuration.

use crate::app;
use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;

use super::args::{ConfigCliArgs, ConfigCommand};

pub fn handle_config_command(args: ConfigCliArgs, config_path: Option<&Path>) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => {
            let config = app::load_config(config_path)?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{}", rendered);
        }
        ConfigCommand::Path => {
            let path = match config_path {
                Some(path) => path.to_path_buf(),
                None => Config::config_path()?,
            };
            println!("{}", path.display());
        }
    }
    Ok(())
}
