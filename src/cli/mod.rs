pub mod args;
pub mod config;
pub mod lights;
pub mod login;
pub mod meetings;

pub use args::{Cli, CliCommand, ConfigCliArgs, ConfigCommand, TestLightsCliArgs};
pub use config::handle_config_command;
pub use lights::handle_test_lights_command;
pub use login::handle_login_command;
pub use meetings::handle_meetings_command;
