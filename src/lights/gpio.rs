//! Lights on Linux GPIO pins through the sysfs interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Channel, EffectorError, LightSink};
use crate::config::LightsConfig;

/// udev may take a moment to make a freshly exported pin writable.
const EXPORT_RETRIES: u32 = 10;
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// BCM pin number for each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub pre_alert: u32,
    pub near_alert: u32,
    pub active: u32,
}

impl PinMap {
    pub fn pin(&self, channel: Channel) -> u32 {
        match channel {
            Channel::PreAlert => self.pre_alert,
            Channel::NearAlert => self.near_alert,
            Channel::Active => self.active,
        }
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            pre_alert: 17,
            near_alert: 27,
            active: 22,
        }
    }
}

impl From<&LightsConfig> for PinMap {
    fn from(config: &LightsConfig) -> Self {
        Self {
            pre_alert: config.pre_alert_pin,
            near_alert: config.near_alert_pin,
            active: config.active_pin,
        }
    }
}

pub struct GpioSink {
    root: PathBuf,
    pins: PinMap,
}

impl GpioSink {
    /// Export every pin, make it an output and drive it low.
    pub fn open(root: impl AsRef<Path>, pins: PinMap) -> Result<Self, EffectorError> {
        let sink = Self {
            root: root.as_ref().to_path_buf(),
            pins,
        };
        for channel in Channel::ALL {
            sink.prepare(sink.pins.pin(channel))?;
        }
        Ok(sink)
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn prepare(&self, pin: u32) -> Result<(), EffectorError> {
        let setup_err = |reason: String| EffectorError::Setup { pin, reason };

        if !self.pin_dir(pin).exists() {
            debug!("Exporting GPIO pin {}", pin);
            fs::write(self.root.join("export"), pin.to_string())
                .map_err(|e| setup_err(format!("export failed: {e}")))?;
        }

        let direction = self.pin_dir(pin).join("direction");
        let mut attempt = 0;
        loop {
            match fs::write(&direction, "out") {
                Ok(()) => break,
                Err(e) if attempt + 1 < EXPORT_RETRIES => {
                    debug!("GPIO pin {} not ready yet ({}), retrying", pin, e);
                    attempt += 1;
                    thread::sleep(EXPORT_RETRY_DELAY);
                }
                Err(e) => return Err(setup_err(format!("cannot set direction: {e}"))),
            }
        }

        fs::write(self.pin_dir(pin).join("value"), "0")
            .map_err(|e| setup_err(format!("cannot drive low: {e}")))
    }
}

impl LightSink for GpioSink {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn set(&mut self, channel: Channel, on: bool) -> Result<(), EffectorError> {
        let pin = self.pins.pin(channel);
        fs::write(
            self.pin_dir(pin).join("value"),
            if on { "1" } else { "0" },
        )
        .map_err(|source| EffectorError::Write { channel, source })
    }

    fn release(&mut self) -> Result<(), EffectorError> {
        let mut first_error = None;
        for channel in Channel::ALL {
            let pin = self.pins.pin(channel);
            if let Err(e) = fs::write(self.root.join("unexport"), pin.to_string()) {
                warn!("Failed to unexport GPIO pin {}: {}", pin, e);
                first_error.get_or_insert(EffectorError::Setup {
                    pin,
                    reason: format!("unexport failed: {e}"),
                });
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_sysfs(pins: &PinMap) -> TempDir {
        let dir = TempDir::new().unwrap();
        for channel in Channel::ALL {
            fs::create_dir(dir.path().join(format!("gpio{}", pins.pin(channel)))).unwrap();
        }
        dir
    }

    fn read(dir: &TempDir, pin: u32, file: &str) -> String {
        fs::read_to_string(dir.path().join(format!("gpio{pin}")).join(file)).unwrap()
    }

    #[test]
    fn test_open_configures_outputs_low() {
        let pins = PinMap::default();
        let dir = fake_sysfs(&pins);

        GpioSink::open(dir.path(), pins).unwrap();

        for pin in [17, 27, 22] {
            assert_eq!(read(&dir, pin, "direction"), "out");
            assert_eq!(read(&dir, pin, "value"), "0");
        }
        // pins already present are not exported again
        assert!(!dir.path().join("export").exists());
    }

    #[test]
    fn test_set_writes_value_file() {
        let pins = PinMap::default();
        let dir = fake_sysfs(&pins);
        let mut sink = GpioSink::open(dir.path(), pins).unwrap();

        sink.set(Channel::NearAlert, true).unwrap();
        assert_eq!(read(&dir, 27, "value"), "1");
        sink.set(Channel::NearAlert, false).unwrap();
        assert_eq!(read(&dir, 27, "value"), "0");
    }

    #[test]
    fn test_release_unexports() {
        let pins = PinMap::default();
        let dir = fake_sysfs(&pins);
        let mut sink = GpioSink::open(dir.path(), pins).unwrap();

        sink.release().unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("unexport")).unwrap(),
            "22"
        );
    }

    #[test]
    fn test_unexported_pin_that_never_appears_fails_setup() {
        let dir = TempDir::new().unwrap();
        let err = GpioSink::open(dir.path(), PinMap::default()).err().unwrap();
        assert!(matches!(err, EffectorError::Setup { pin: 17, .. }));
        assert_eq!(fs::read_to_string(dir.path().join("export")).unwrap(), "17");
    }

    #[test]
    fn test_write_failure_maps_to_channel() {
        let pins = PinMap::default();
        let dir = fake_sysfs(&pins);
        let mut sink = GpioSink::open(dir.path(), pins).unwrap();
        fs::remove_dir_all(dir.path().join("gpio22")).unwrap();

        let err = sink.set(Channel::Active, true).unwrap_err();
        assert!(matches!(
            err,
            EffectorError::Write {
                channel: Channel::Active,
                ..
            }
        ));
    }
}
