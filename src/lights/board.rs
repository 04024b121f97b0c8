use tracing::{debug, error, info, warn};

use super::{Channel, EffectorError, LightSink};
use crate::window::AggregateState;

/// Applies aggregate states to a sink and owns its teardown.
///
/// Dropping a board that was never shut down switches every light off and
/// releases the sink, so early returns and panics leave the lights dark.
pub struct LightBoard {
    sink: Box<dyn LightSink>,
    last: [Option<bool>; 3],
    skip_unchanged: bool,
    released: bool,
}

impl LightBoard {
    pub fn new(sink: Box<dyn LightSink>, skip_unchanged: bool) -> Self {
        Self {
            sink,
            last: [None; 3],
            skip_unchanged,
            released: false,
        }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Last value successfully written to each channel, by channel index.
    pub fn last_applied(&self) -> [Option<bool>; 3] {
        self.last
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Write `state` to the lights.
    ///
    /// Every channel is attempted even if an earlier one fails; the first
    /// failure is returned. A failed channel is retried on the next call.
    pub fn apply(&mut self, state: AggregateState) -> Result<(), EffectorError> {
        self.write_all(state, self.skip_unchanged)
    }

    /// Switch every light off, regardless of what was last written.
    pub fn all_off(&mut self) -> Result<(), EffectorError> {
        self.write_all(AggregateState::all_off(), false)
    }

    /// Switch everything off and release the sink. Only the first call does
    /// anything.
    pub fn shutdown(&mut self) -> Result<(), EffectorError> {
        if self.released {
            return Ok(());
        }
        let off = self.all_off();
        self.released = true;
        let released = self.sink.release();
        info!("Lights switched off and {} sink released", self.sink.name());
        off.and(released)
    }

    fn write_all(&mut self, state: AggregateState, skip_unchanged: bool) -> Result<(), EffectorError> {
        if self.released {
            return Err(EffectorError::Released);
        }

        let mut first_error = None;
        for channel in Channel::ALL {
            let desired = state.get(channel.signal());
            let previous = self.last[channel.index()];
            if skip_unchanged && previous == Some(desired) {
                continue;
            }

            match self.sink.set(channel, desired) {
                Ok(()) => {
                    if previous != Some(desired) {
                        info!(
                            "{} light {}",
                            channel,
                            if desired { "on" } else { "off" }
                        );
                    } else {
                        debug!("{} light rewritten ({})", channel, desired);
                    }
                    self.last[channel.index()] = Some(desired);
                }
                Err(e) => {
                    warn!("Light write failed: {}", e);
                    self.last[channel.index()] = None;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for LightBoard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.shutdown() {
                error!("Failed to switch lights off on teardown: {}", e);
            }
        }
    }
}
