//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use sb_core::{AvailabilityPolicy, CheckInPolicy, DemandWindow, MinuteOfDay};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Opening hours and demand windows.
    #[serde(default)]
    pub opening: OpeningConfig,

    /// Check-in eligibility windows.
    #[serde(default)]
    pub checkin: CheckinConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("opening", &self.opening)
            .field("checkin", &self.checkin)
            .finish()
    }
}

/// Opening window for the slot grid, as `HH:MM` strings in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningConfig {
    pub open: String,
    pub close: String,
    pub step_minutes: u16,
    #[serde(default = "default_high_demand")]
    pub high_demand: Vec<DemandWindowConfig>,
}

/// One high-demand window, `HH:MM` to `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandWindowConfig {
    pub start: String,
    pub end: String,
}

fn default_high_demand() -> Vec<DemandWindowConfig> {
    vec![
        DemandWindowConfig {
            start: "10:00".to_string(),
            end: "12:00".to_string(),
        },
        DemandWindowConfig {
            start: "14:00".to_string(),
            end: "16:00".to_string(),
        },
    ]
}

impl Default for OpeningConfig {
    fn default() -> Self {
        Self {
            open: "08:00".to_string(),
            close: "22:00".to_string(),
            step_minutes: 30,
            high_demand: default_high_demand(),
        }
    }
}

/// Check-in window configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckinConfig {
    pub early_minutes: u32,
    pub grace_minutes: u32,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            early_minutes: 15,
            grace_minutes: 30,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (SB_*)
        figment = figment.merge(Env::prefixed("SB_"));

        figment.extract()
    }

    /// The configured opening policy for the availability calculator.
    pub fn availability_policy(&self) -> anyhow::Result<AvailabilityPolicy> {
        let open: MinuteOfDay = self
            .opening
            .open
            .parse()
            .map_err(|e| anyhow::anyhow!("opening.open: {e}"))?;
        let close = parse_close(&self.opening.close)?;
        let mut high_demand = Vec::with_capacity(self.opening.high_demand.len());
        for window in &self.opening.high_demand {
            let start: MinuteOfDay = window
                .start
                .parse()
                .map_err(|e| anyhow::anyhow!("opening.high_demand start: {e}"))?;
            let end = parse_close(&window.end)?;
            high_demand.push(DemandWindow::new(start.value(), end));
        }
        Ok(AvailabilityPolicy {
            open,
            close,
            step_minutes: self.opening.step_minutes,
            high_demand,
        })
    }

    /// The configured check-in window policy.
    #[must_use]
    pub const fn checkin_policy(&self) -> CheckInPolicy {
        CheckInPolicy {
            early_minutes: self.checkin.early_minutes,
            grace_minutes: self.checkin.grace_minutes,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("sb.db"),
            opening: OpeningConfig::default(),
            checkin: CheckinConfig::default(),
        }
    }
}

/// Parses a closing boundary, where `24:00` (end of day) is allowed.
fn parse_close(value: &str) -> anyhow::Result<u16> {
    if value == "24:00" {
        return Ok(MinuteOfDay::MINUTES_PER_DAY);
    }
    let minute: MinuteOfDay = value
        .parse()
        .map_err(|e| anyhow::anyhow!("closing time: {e}"))?;
    Ok(minute.value())
}

/// Returns the platform-specific config directory for sb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sb"))
}

/// Returns the platform-specific data directory for sb.
///
/// On Linux: `~/.local/share/sb`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("sb"))
}
