use crate::auth::{self, TokenProvider};
use crate::calendar::{CalendarSource, DayWindow, GraphCalendarClient};
use crate::config::{Config, LightsConfig, ScheduleConfig};
use crate::global;
use crate::lights::{open_board, LightBoard};
use crate::meeting::RawMeeting;
use crate::poller::{Clock, PollContext, PollLoop, StopReason, SystemClock};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Load the config from `path`, or the default location when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Open the configured lights on the blocking pool, since GPIO setup may
/// sleep while newly exported pins become writable.
pub async fn open_lights(config: &LightsConfig) -> Result<LightBoard> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || open_board(&config))
        .await
        .context("Light setup task failed")?
        .context("Failed to open indicator lights")
}

/// Ask for a token, then fetch the meetings of the day containing `now`.
pub async fn fetch_meetings(
    provider: &dyn TokenProvider,
    source: &dyn CalendarSource,
    schedule: &ScheduleConfig,
    now: DateTime<Utc>,
) -> Result<Vec<RawMeeting>> {
    let zone = schedule.reference_zone()?;
    let token = provider
        .acquire_token()
        .await
        .context("Failed to acquire an access token")?;
    let window = DayWindow::containing(now, zone)?;
    source
        .fetch_day(&window, &token)
        .await
        .context("Failed to fetch today's meetings")
}

pub fn log_schedule(context: &PollContext) {
    info!("Meetings for the day:");
    for meeting in context.meetings() {
        info!(
            "- {}: Start - {}, End - {}",
            meeting.subject(),
            meeting.start().format("%I:%M %p"),
            meeting.end().format("%I:%M %p")
        );
    }
}

/// The calendar-to-lights pipeline with its collaborators injected.
pub struct Service {
    provider: Box<dyn TokenProvider>,
    source: Box<dyn CalendarSource>,
    schedule: ScheduleConfig,
}

impl Service {
    pub fn new(
        provider: Box<dyn TokenProvider>,
        source: Box<dyn CalendarSource>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            provider,
            source,
            schedule,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = auth::build_provider(&config.auth, global::token_cache_file()?)
            .context("Failed to set up authentication")?;
        let source = GraphCalendarClient::from_config(&config.calendar);
        Ok(Self::new(provider, Box::new(source), config.schedule.clone()))
    }

    /// Fetch once and build the context the poll loop runs on.
    pub async fn fetch_context(&self, now: DateTime<Utc>) -> Result<PollContext> {
        let raws = fetch_meetings(
            self.provider.as_ref(),
            self.source.as_ref(),
            &self.schedule,
            now,
        )
        .await?;
        PollContext::from_raw(&raws, &self.schedule)
    }

    /// Fetch, then drive `board` until cancelled or out of time.
    ///
    /// Returns `None` when the loop never started: an empty schedule, or a
    /// cancellation during startup. The board is shut down on every path.
    pub async fn run<C: Clock>(
        &self,
        board: &mut LightBoard,
        clock: C,
        cancel: &CancellationToken,
    ) -> Result<Option<StopReason>> {
        let result = self.run_inner(board, clock, cancel).await;
        if let Err(e) = board.shutdown() {
            error!("Failed to switch lights off: {}", e);
        }
        result
    }

    async fn run_inner<C: Clock>(
        &self,
        board: &mut LightBoard,
        clock: C,
        cancel: &CancellationToken,
    ) -> Result<Option<StopReason>> {
        if let Err(e) = board.all_off() {
            warn!("Could not reset lights at startup: {}", e);
        }

        let startup = self.fetch_context(clock.now());
        let context = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Shutdown requested during startup");
                return Ok(None);
            }
            context = startup => context?,
        };

        if context.is_empty() {
            info!("No meetings found for today; nothing to watch");
            return Ok(None);
        }
        log_schedule(&context);

        let mut poll = PollLoop::with_clock(context, clock);
        poll.run(board, cancel).await.map(Some)
    }
}

pub async fn run_service(config_path: Option<&Path>) -> Result<()> {
    info!("Starting meetlight");

    let config = load_config(config_path)?;
    let service = Service::from_config(&config)?;

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let mut board = open_lights(&config.lights).await?;

    match service.run(&mut board, SystemClock, &cancel).await? {
        Some(StopReason::MaxRuntimeElapsed) => info!("Maximum runtime reached, exiting"),
        Some(StopReason::Cancelled) | None => info!("meetlight stopped"),
    }
    Ok(())
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
pub fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LightBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_lights_dry_run() {
        let config = LightsConfig {
            backend: LightBackend::DryRun,
            ..LightsConfig::default()
        };
        let board = open_lights(&config).await.unwrap();
        assert_eq!(board.sink_name(), "dry-run");
    }

    #[tokio::test]
    async fn test_open_lights_prepares_gpio_pins() {
        let root = TempDir::new().unwrap();
        for pin in [17, 27, 22] {
            std::fs::create_dir(root.path().join(format!("gpio{pin}"))).unwrap();
        }
        let config = LightsConfig {
            backend: LightBackend::Gpio,
            gpio_root: root.path().to_path_buf(),
            ..LightsConfig::default()
        };

        let mut board = open_lights(&config).await.unwrap();
        assert_eq!(board.sink_name(), "gpio");
        for pin in [17, 27, 22] {
            let dir = root.path().join(format!("gpio{pin}"));
            assert_eq!(std::fs::read_to_string(dir.join("direction")).unwrap(), "out");
            assert_eq!(std::fs::read_to_string(dir.join("value")).unwrap(), "0");
        }
        board.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_open_lights_reports_setup_failure() {
        let root = TempDir::new().unwrap();
        let config = LightsConfig {
            backend: LightBackend::Gpio,
            gpio_root: root.path().join("missing"),
            ..LightsConfig::default()
        };
        let err = open_lights(&config).await.err().unwrap();
        assert!(format!("{err:#}").contains("Failed to open indicator lights"));
    }
}
