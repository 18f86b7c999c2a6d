//! Configuration for the vitalstream telemetry server.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Session termination policy for a delivery connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Close the connection immediately after the first successful send.
    OneShot,
    /// Keep the connection open and send further payloads (newline-framed)
    /// until the peer disconnects.
    Streaming,
}

/// Main configuration, one section per sensor kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub temperature: TemperatureConfig,
    pub oximeter: OximeterConfig,

    /// Session termination policy used by both servers
    pub delivery_mode: DeliveryMode,

    /// Path for storing session statistics
    pub data_path: PathBuf,
}

/// Deployment settings for the temperature server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    /// Listen address
    pub listen: SocketAddr,
    /// Readings accumulated per batch
    pub batch_capacity: usize,
    /// Delay between polling cycles, in milliseconds
    pub poll_interval_ms: u64,
    /// Fixed calibration offset added to every raw sample, degrees C
    pub calibration_offset_c: f64,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            listen: ([127, 0, 0, 1], 65432).into(),
            batch_capacity: 10,
            poll_interval_ms: 500,
            calibration_offset_c: 6.7,
        }
    }
}

/// Deployment settings for the pulse-oximetry server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OximeterConfig {
    /// Listen address
    pub listen: SocketAddr,
    /// Readings accumulated per batch
    pub batch_capacity: usize,
    /// Delay between polling cycles, in milliseconds
    pub poll_interval_ms: u64,
    /// Sample rate of the photoplethysmography front-end
    pub sample_rate_hz: f64,
}

impl Default for OximeterConfig {
    fn default() -> Self {
        Self {
            listen: ([127, 0, 0, 1], 65433).into(),
            batch_capacity: 100,
            poll_interval_ms: 10,
            sample_rate_hz: 25.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vitalstream");

        Self {
            temperature: TemperatureConfig::default(),
            oximeter: OximeterConfig::default(),
            delivery_mode: DeliveryMode::OneShot,
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vitalstream")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.temperature.batch_capacity, 10);
        assert_eq!(config.oximeter.batch_capacity, 100);
        assert_eq!(config.delivery_mode, DeliveryMode::OneShot);
        assert_ne!(config.temperature.listen, config.oximeter.listen);
    }

    #[test]
    fn test_delivery_mode_roundtrip() {
        let json = serde_json::to_string(&DeliveryMode::Streaming).unwrap();
        assert_eq!(json, r#""streaming""#);
        let mode: DeliveryMode = serde_json::from_str(&json).unwrap();
        assert_eq!(mode, DeliveryMode::Streaming);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.temperature.listen, config.temperature.listen);
        assert_eq!(
            parsed.temperature.calibration_offset_c,
            config.temperature.calibration_offset_c
        );
        assert_eq!(parsed.oximeter.sample_rate_hz, config.oximeter.sample_rate_hz);
    }
}
