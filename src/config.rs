// src/config.rs
//! Configuration management with file-based storage

use crate::{
    error::{Result, TrackerError},
    provider::{gpsd, nmea, GpsdProvider, LocationProvider, SerialProvider, UnsupportedProvider},
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use tracing::debug;

/// Where location fixes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Gpsd,
    Serial,
    Windows,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Gpsd => write!(f, "gpsd"),
            SourceKind::Serial => write!(f, "serial"),
            SourceKind::Windows => write!(f, "windows"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub source: SourceKind,
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl TrackerConfig {
    /// Get platform-specific default configuration
    pub fn platform_default() -> Self {
        let source = if cfg!(windows) {
            SourceKind::Windows
        } else {
            SourceKind::Gpsd
        };

        Self {
            source,
            gpsd_host: Some(gpsd::DEFAULT_HOST.to_string()),
            gpsd_port: Some(gpsd::DEFAULT_PORT),
            serial_port: None,
            serial_baudrate: Some(nmea::DEFAULT_BAUDRATE),
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Load from a config file; a missing file yields the platform default
    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::platform_default());
        }

        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| TrackerError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TrackerError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save to a config file, creating parent directories as needed
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(config_path, contents)
            .map_err(|e| TrackerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        #[cfg(windows)]
        {
            let appdata = std::env::var("APPDATA")
                .map_err(|_| TrackerError::Config("APPDATA environment variable not set".to_string()))?;
            Ok(PathBuf::from(appdata).join("location-tracker").join("config.json"))
        }

        #[cfg(not(windows))]
        {
            let home = std::env::var("HOME")
                .map_err(|_| TrackerError::Config("HOME environment variable not set".to_string()))?;
            Ok(PathBuf::from(home).join(".config").join("location-tracker").join("config.json"))
        }
    }

    /// Build the provider this configuration describes
    pub fn build_provider(&self) -> Box<dyn LocationProvider> {
        match self.source {
            SourceKind::Gpsd => Box::new(GpsdProvider::new(
                self.gpsd_host.clone().unwrap_or_else(|| gpsd::DEFAULT_HOST.to_string()),
                self.gpsd_port.unwrap_or(gpsd::DEFAULT_PORT),
            )),
            SourceKind::Serial => match &self.serial_port {
                Some(port) => Box::new(SerialProvider::new(
                    port.clone(),
                    self.serial_baudrate.unwrap_or(nmea::DEFAULT_BAUDRATE),
                )),
                None => Box::new(UnsupportedProvider::new("no serial port configured")),
            },
            SourceKind::Windows => Self::windows_provider(),
        }
    }

    #[cfg(windows)]
    fn windows_provider() -> Box<dyn LocationProvider> {
        Box::new(crate::provider::WindowsProvider::new())
    }

    #[cfg(not(windows))]
    fn windows_provider() -> Box<dyn LocationProvider> {
        Box::new(UnsupportedProvider::new(
            "Windows Location Service is only available on Windows",
        ))
    }
}
