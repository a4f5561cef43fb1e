// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Configuration module

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::capture::MediaConstraints;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level
    pub log_level: String,

    /// What to ask the device for
    pub capture: MediaConstraints,

    /// Scan configuration
    pub scan: ScanConfig,

    /// History configuration
    pub history: HistoryConfig,

    /// Event bus configuration
    pub events: EventConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "DeepGuard".to_string(),
            log_level: "info".to_string(),
            capture: MediaConstraints::default(),
            scan: ScanConfig::default(),
            history: HistoryConfig::default(),
            events: EventConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the core cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.scan.authentic_probability),
            "scan.authentic_probability must be within [0, 1], got {}",
            self.scan.authentic_probability
        );
        ensure!(self.events.channel_capacity > 0, "events.channel_capacity must be > 0");
        ensure!(
            self.capture.video || self.capture.audio,
            "capture must request video, audio or both"
        );
        if let Some(max) = self.history.max_records {
            ensure!(max > 0, "history.max_records must be > 0 when set");
        }
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("deepguard"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Scan configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Abort a scan whose detector has not answered after this long. 0 disables.
    pub detector_timeout_ms: u64,

    /// Placeholder detector: chance of an "authentic" verdict
    pub authentic_probability: f64,

    /// Placeholder detector: simulated analysis time
    pub simulated_latency_ms: u64,

    /// Placeholder detector: standard deviation of the analysis time
    pub latency_jitter_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detector_timeout_ms: 10_000,
            authentic_probability: 0.7,
            simulated_latency_ms: 2_500,
            latency_jitter_ms: 0,
        }
    }
}

impl ScanConfig {
    pub fn detector_timeout(&self) -> Option<Duration> {
        match self.detector_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// History configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Upper bound on stored verdicts; unbounded when absent
    pub max_records: Option<usize>,
}

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Per-subscriber buffer before slow subscribers start lagging
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FacingMode;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.scan.detector_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.capture.facing_mode, FacingMode::User);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.history.max_records = Some(50);
        config.capture.facing_mode = FacingMode::Environment;

        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scan]
            detector_timeout_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.detector_timeout(), None);
        assert_eq!(config.scan.simulated_latency_ms, 2_500);
        assert_eq!(config.events.channel_capacity, 256);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scan.authentic_probability = 1.2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.events.channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.capture.video = false;
        config.capture.audio = false;
        assert!(config.validate().is_err());
    }
}
