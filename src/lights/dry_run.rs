use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use super::{Channel, EffectorError, LightSink};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DryRunState {
    pub channels: [bool; 3],
    pub writes: usize,
    pub released: bool,
}

/// Shared view of what a [`DryRunSink`] would have switched.
#[derive(Debug, Clone, Default)]
pub struct DryRunHandle {
    inner: Arc<Mutex<DryRunState>>,
}

impl DryRunHandle {
    pub fn snapshot(&self) -> DryRunState {
        self.lock().clone()
    }

    pub fn is_on(&self, channel: Channel) -> bool {
        self.lock().channels[channel.index()]
    }

    fn lock(&self) -> MutexGuard<'_, DryRunState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Logs every write instead of touching hardware.
pub struct DryRunSink {
    handle: DryRunHandle,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self {
            handle: DryRunHandle::default(),
        }
    }

    pub fn handle(&self) -> DryRunHandle {
        self.handle.clone()
    }
}

impl Default for DryRunSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LightSink for DryRunSink {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn set(&mut self, channel: Channel, on: bool) -> Result<(), EffectorError> {
        info!("[dry-run] {} -> {}", channel, if on { "ON" } else { "OFF" });
        let mut state = self.handle.lock();
        state.channels[channel.index()] = on;
        state.writes += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), EffectorError> {
        self.handle.lock().released = true;
        Ok(())
    }
}
