//! CLI handler for the light test.

use crate::app;
use crate::lights::run_light_test;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::args::TestLightsCliArgs;

pub async fn handle_test_lights_command(
    args: TestLightsCliArgs,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = app::load_config(config_path)?;
    let mut board = app::open_lights(&config.lights).await?;

    let cancel = CancellationToken::new();
    app::spawn_shutdown_listener(cancel.clone());

    println!(
        "Testing {} lights, {}s each (Ctrl-C to stop)",
        board.sink_name(),
        args.seconds
    );
    run_light_test(&mut board, Duration::from_secs(args.seconds), &cancel)
        .await
        .context("Light test failed")?;
    println!("Light test complete");
    Ok(())
}
