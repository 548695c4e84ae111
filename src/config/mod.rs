//! Configuration management for blescan
//!
//! Configuration comes from three layers, later ones winning:
//! - Built-in defaults
//! - An optional TOML file
//! - `BLESCAN_*` environment variables

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mobile::Rationale;
use crate::transport::ScanFilter;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub platform: Platform,
    pub permission: Rationale,
    pub scan: ScanConfig,
    pub ui: UiConfig,
}

/// Platform family, which decides how scanning is authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

impl Platform {
    /// Platform family of the build target
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "desktop" | "linux" | "macos" | "windows" => Ok(Platform::Desktop),
            other => Err(Error::Config(format!("Unknown platform: '{}'", other))),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Scan behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Deliver the adapter state immediately when subscribing
    pub emit_current_state: bool,
    /// Service UUID filter; empty discovers every advertising device
    pub services: Vec<Uuid>,
    /// Stop automatically after this long (CLI only)
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    /// How long to wait for the first adapter state before giving up
    #[serde(with = "humantime_serde")]
    pub adapter_settle_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            emit_current_state: true,
            services: Vec::new(),
            duration: None,
            adapter_settle_timeout: Duration::from_secs(2),
        }
    }
}

impl ScanConfig {
    pub fn filter(&self) -> ScanFilter {
        ScanFilter {
            services: self.services.clone(),
        }
    }
}

/// Labels of the single screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub start_label: String,
    pub stop_label: String,
    pub heading: String,
    pub placeholder_name: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            start_label: "Start Scan".to_string(),
            stop_label: "Stop Scan".to_string(),
            heading: "Devices:".to_string(),
            placeholder_name: "Unknown Device".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        config.override_from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)?;
        log::debug!("Loaded configuration from {}", path.display());

        Ok(config)
    }

    /// Override values from `BLESCAN_*` environment variables
    pub fn override_from_env(&mut self) -> Result<()> {
        self.override_from(|key| env::var(key).ok())
    }

    fn override_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(platform) = lookup("BLESCAN_PLATFORM") {
            self.platform = Platform::parse(&platform)?;
        }

        if let Some(seconds) = lookup("BLESCAN_SCAN_DURATION") {
            let seconds: u64 = seconds.parse().map_err(|_| {
                Error::Config(format!("Invalid BLESCAN_SCAN_DURATION: '{}'", seconds))
            })?;
            self.scan.duration = Some(Duration::from_secs(seconds));
        }

        if let Some(placeholder) = lookup("BLESCAN_PLACEHOLDER_NAME") {
            self.ui.placeholder_name = placeholder;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let labels = [
            ("ui.start_label", &self.ui.start_label),
            ("ui.stop_label", &self.ui.stop_label),
            ("ui.placeholder_name", &self.ui.placeholder_name),
            ("permission.title", &self.permission.title),
            ("permission.button_positive", &self.permission.button_positive),
        ];
        for (name, value) in labels {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", name)));
            }
        }

        if self.scan.duration == Some(Duration::ZERO) {
            return Err(Error::Config("scan.duration must be positive".to_string()));
        }

        Ok(())
    }
}
