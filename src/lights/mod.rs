//! Indicator light output.
//!
//! A [`LightSink`] drives three binary channels. The [`LightBoard`] sits in
//! front of it, tracks what was last written, and guarantees the lights are
//! switched off when it goes away.

pub mod board;
pub mod dry_run;
pub mod gpio;
pub mod test_pattern;

pub use board::LightBoard;
pub use dry_run::{DryRunHandle, DryRunSink};
pub use gpio::{GpioSink, PinMap};
pub use test_pattern::run_light_test;

use crate::config::{LightBackend, LightsConfig};
use crate::window::Signal;
use std::fmt;
use thiserror::Error;
use tracing::info;

/// One of the three physical lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    PreAlert,
    NearAlert,
    Active,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::PreAlert, Channel::NearAlert, Channel::Active];

    /// Stable index of the channel, 0 through 2.
    pub fn index(&self) -> usize {
        match self {
            Channel::PreAlert => 0,
            Channel::NearAlert => 1,
            Channel::Active => 2,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Channel::PreAlert => "yellow",
            Channel::NearAlert => "orange",
            Channel::Active => "red",
        }
    }

    pub fn signal(&self) -> Signal {
        match self {
            Channel::PreAlert => Signal::PreAlert,
            Channel::NearAlert => Signal::NearAlert,
            Channel::Active => Signal::Active,
        }
    }
}

impl From<Signal> for Channel {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::PreAlert => Channel::PreAlert,
            Signal::NearAlert => Channel::NearAlert,
            Signal::Active => Channel::Active,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.color(), self.signal())
    }
}

#[derive(Debug, Error)]
pub enum EffectorError {
    #[error("failed to set {channel} light: {source}")]
    Write {
        channel: Channel,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare GPIO pin {pin}: {reason}")]
    Setup { pin: u32, reason: String },
    #[error("light board has already been shut down")]
    Released,
}

/// Hardware (or pretend hardware) behind the three lights.
pub trait LightSink: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn set(&mut self, channel: Channel, on: bool) -> Result<(), EffectorError>;

    /// Give the underlying resource back. Called once, after all channels
    /// have been switched off.
    fn release(&mut self) -> Result<(), EffectorError> {
        Ok(())
    }
}

/// Open the sink selected in the configuration.
pub fn open_sink(config: &LightsConfig) -> Result<Box<dyn LightSink>, EffectorError> {
    match config.backend {
        LightBackend::Gpio => {
            let sink = GpioSink::open(&config.gpio_root, PinMap::from(config))?;
            info!(
                "Using GPIO lights under {:?} (pins {}/{}/{})",
                config.gpio_root, config.pre_alert_pin, config.near_alert_pin, config.active_pin
            );
            Ok(Box::new(sink))
        }
        LightBackend::DryRun => {
            info!("Using dry-run lights; nothing will be switched");
            Ok(Box::new(DryRunSink::new()))
        }
    }
}

/// Open the configured sink and wrap it in a [`LightBoard`].
pub fn open_board(config: &LightsConfig) -> Result<LightBoard, EffectorError> {
    let sink = open_sink(config)?;
    Ok(LightBoard::new(sink, config.skip_unchanged_writes))
}
