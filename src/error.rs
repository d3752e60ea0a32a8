// src/error.rs
//! Error types for the location tracker

use std::fmt;

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Failures of the surrounding application (I/O, configuration, front ends).
///
/// Errors reported by a location provider during a watch never become a
/// `TrackerError`; they are surfaced as status text by the tracker.
#[derive(Debug)]
pub enum TrackerError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    Config(String),
    #[cfg(windows)]
    Windows(windows::core::Error),
    #[cfg(all(unix, not(target_os = "macos"), feature = "gui"))]
    Gui(eframe::Error),
    Other(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Io(e) => write!(f, "IO error: {}", e),
            TrackerError::Serial(e) => write!(f, "Serial error: {}", e),
            TrackerError::Json(e) => write!(f, "JSON error: {}", e),
            TrackerError::Connection(msg) => write!(f, "Connection error: {}", msg),
            TrackerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            #[cfg(windows)]
            TrackerError::Windows(e) => write!(f, "Windows error: {}", e),
            #[cfg(all(unix, not(target_os = "macos"), feature = "gui"))]
            TrackerError::Gui(e) => write!(f, "GUI error: {}", e),
            TrackerError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<std::io::Error> for TrackerError {
    fn from(error: std::io::Error) -> Self {
        TrackerError::Io(error)
    }
}

impl From<tokio_serial::Error> for TrackerError {
    fn from(error: tokio_serial::Error) -> Self {
        TrackerError::Serial(error)
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(error: serde_json::Error) -> Self {
        TrackerError::Json(error)
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for TrackerError {
    fn from(error: windows::core::Error) -> Self {
        TrackerError::Windows(error)
    }
}

#[cfg(all(unix, not(target_os = "macos"), feature = "gui"))]
impl From<eframe::Error> for TrackerError {
    fn from(error: eframe::Error) -> Self {
        TrackerError::Gui(error)
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(error: anyhow::Error) -> Self {
        TrackerError::Other(error.to_string())
    }
}
