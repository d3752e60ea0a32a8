// src/lib.rs
//! Location Tracker Library
//!
//! Tracks the device location through a pluggable provider (gpsd, NMEA
//! serial receiver, Windows Location Services) and exposes start/stop
//! controls plus a single status line for a front end to draw.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod provider;
pub mod tracker;

// Re-export main types for convenience
pub use error::{Result, TrackerError};
pub use provider::{
    LocationProvider, Position, PositionErrorCode, PositionSink, SubscriptionHandle, WatchOptions,
};
pub use tracker::{LocationTracker, TrackerView, TrackingState};

#[cfg(all(unix, not(target_os = "macos"), feature = "gui"))]
pub use display::gui::TrackerApp;
