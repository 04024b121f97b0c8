use crate::global;
use crate::meeting::parse_zone;
use crate::window::Thresholds;
use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub calendar: CalendarConfig,
    pub auth: AuthConfig,
    pub lights: LightsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA zone every meeting is converted into before comparison.
    pub reference_zone: String,
    /// Minutes before a meeting the yellow light comes on.
    pub pre_alert_minutes: i64,
    /// Minutes before a meeting the orange light takes over.
    pub near_alert_minutes: i64,
    pub poll_interval_seconds: u64,
    /// Stop after this many hours. 0 runs until interrupted.
    pub max_runtime_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Microsoft Graph base URL.
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Application (client) id registered with the identity platform.
    pub client_id: String,
    pub authority: String,
    pub scopes: Vec<String>,
    /// Fall back to the device-code sign-in when no cached token works.
    pub interactive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LightBackend {
    Gpio,
    DryRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub backend: LightBackend,
    pub gpio_root: PathBuf,
    pub pre_alert_pin: u32,
    pub near_alert_pin: u32,
    pub active_pin: u32,
    /// Skip writing a light whose value has not changed since the last tick.
    pub skip_unchanged_writes: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reference_zone: "America/Los_Angeles".to_string(),
            pre_alert_minutes: 15,
            near_alert_minutes: 5,
            poll_interval_seconds: 10,
            max_runtime_hours: 8,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://graph.microsoft.com/v1.0".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            authority: "https://login.microsoftonline.com/common".to_string(),
            scopes: vec!["Calendars.Read".to_string()],
            interactive: true,
        }
    }
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            backend: LightBackend::Gpio,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            pre_alert_pin: 17,
            near_alert_pin: 27,
            active_pin: 22,
            skip_unchanged_writes: true,
        }
    }
}

impl ScheduleConfig {
    pub fn reference_zone(&self) -> Result<Tz> {
        parse_zone(&self.reference_zone)
            .with_context(|| format!("Invalid reference_zone {:?}", self.reference_zone))
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::from_minutes(self.pre_alert_minutes, self.near_alert_minutes)
            .context("Invalid alert thresholds")
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        if self.poll_interval_seconds == 0 {
            bail!("poll_interval_seconds must be at least 1");
        }
        Ok(Duration::from_secs(self.poll_interval_seconds))
    }

    /// `None` when `max_runtime_hours` is 0.
    pub fn max_runtime(&self) -> Result<Option<Duration>> {
        match self.max_runtime_hours {
            0 => Ok(None),
            hours => hours
                .checked_mul(3600)
                .map(|secs| Some(Duration::from_secs(secs)))
                .with_context(|| format!("max_runtime_hours {hours} is out of range")),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `config_path`, writing a default file there when none exists.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Check every value the poll loop depends on.
    pub fn validate(&self) -> Result<()> {
        self.schedule.reference_zone()?;
        self.schedule.thresholds()?;
        self.schedule.poll_interval()?;
        self.schedule.max_runtime()?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        let reloaded = Config::load_from(&path).unwrap();

        assert_eq!(created.schedule.reference_zone, reloaded.schedule.reference_zone);
        assert_eq!(reloaded.lights.backend, LightBackend::Gpio);
        assert_eq!(reloaded.lights.active_pin, 22);
        assert_eq!(reloaded.auth.scopes, vec!["Calendars.Read".to_string()]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[schedule]
reference_zone = "Europe/London"

[lights]
backend = "dry-run"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.schedule.reference_zone().unwrap(), chrono_tz::Europe::London);
        assert_eq!(config.schedule.pre_alert_minutes, 15);
        assert_eq!(config.schedule.poll_interval().unwrap(), Duration::from_secs(10));
        assert_eq!(config.lights.backend, LightBackend::DryRun);
        assert_eq!(config.lights.pre_alert_pin, 17);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.schedule.near_alert_minutes = 20;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.reference_zone = "Nowhere/Special".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.poll_interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.pre_alert_minutes = i64::MAX / 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.near_alert_minutes = i64::MIN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.max_runtime_hours = u64::MAX / 3600 + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unparseable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[schedule\nbroken").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_max_runtime_zero_disables() {
        let mut schedule = ScheduleConfig::default();
        assert_eq!(schedule.max_runtime().unwrap(), Some(Duration::from_secs(8 * 3600)));
        schedule.max_runtime_hours = 0;
        assert_eq!(schedule.max_runtime().unwrap(), None);
    }
}
