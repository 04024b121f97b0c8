use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetlight")]
#[command(about = "Calendar-driven meeting indicator lights", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Fetch today's meetings and drive the lights (default)
    Run,
    /// List today's meetings and the signals each raises right now
    Meetings,
    /// Sign in and cache a token for later runs
    Login,
    /// Light each indicator in turn
    TestLights(TestLightsCliArgs),
    /// Inspect the configuration
    Config(ConfigCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct TestLightsCliArgs {
    /// Seconds each light stays on
    #[arg(short, long, default_value = "5")]
    pub seconds: u64,
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML (default)
    Show,
    /// Print where the configuration file lives
    Path,
}
