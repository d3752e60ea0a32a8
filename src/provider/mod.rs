// src/provider/mod.rs
//! Location capability providers
//!
//! A provider owns the platform side of a position watch. The tracker hands
//! it a [`PositionSink`] and gets back a [`SubscriptionHandle`]; the provider
//! reports fixes and failures through the sink until the handle is
//! unsubscribed.

pub mod gpsd;
pub mod nmea;
pub mod unsupported;

mod tasks;

#[cfg(windows)]
pub mod windows;

use chrono::{DateTime, Utc};
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::sync::mpsc;

pub use gpsd::GpsdProvider;
pub use nmea::{list_serial_ports, SerialProvider};
pub use unsupported::UnsupportedProvider;

#[cfg(windows)]
pub use self::windows::WindowsProvider;

/// A single position fix reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>, // meters
    pub accuracy: Option<f64>, // meters
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }
}

/// Failure reasons a provider can report while a watch is live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Other,
}

impl PositionErrorCode {
    /// Text shown to the user for this failure
    pub fn message(&self) -> &'static str {
        match self {
            PositionErrorCode::PermissionDenied => "User denied the request for Geolocation.",
            PositionErrorCode::PositionUnavailable => "Location information is unavailable.",
            PositionErrorCode::Timeout => "The request to get user location timed out.",
            PositionErrorCode::Other => "An unknown error occurred.",
        }
    }
}

impl fmt::Display for PositionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Options passed to a provider when a watch is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix the provider may hand back; zero forces a fresh one.
    pub maximum_age: Duration,
    /// How long a single position request may take before `Timeout` is reported.
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: Duration::from_millis(1000),
        }
    }
}

/// Opaque identifier of a live watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Allocate a process-wide unique handle
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

/// A callback delivered by a provider
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Success(Position),
    Error(PositionErrorCode),
}

/// Callback injection point handed to a provider on subscribe.
///
/// Sends fail once the receiving subscription has been dropped, which is the
/// provider's signal to end its watch.
#[derive(Debug, Clone)]
pub struct PositionSink {
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl PositionSink {
    /// Create a sink and the receiver the tracker reads events from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report a position fix; returns false if nobody is listening anymore
    pub fn success(&self, position: Position) -> bool {
        self.tx.send(WatchEvent::Success(position)).is_ok()
    }

    /// Report a failure; returns false if nobody is listening anymore
    pub fn error(&self, code: PositionErrorCode) -> bool {
        self.tx.send(WatchEvent::Error(code)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Platform capability that can report device location
pub trait LocationProvider {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether this device/platform can answer location queries at all
    fn is_supported(&self) -> bool;

    /// Start a watch that reports through `sink` until unsubscribed.
    ///
    /// The gpsd and serial providers run their watch as a task on the
    /// current tokio runtime; called outside one, they report
    /// `PositionUnavailable` through `sink` instead of starting a watch.
    fn subscribe(&mut self, sink: PositionSink, options: WatchOptions) -> SubscriptionHandle;

    /// Cancel a watch; unknown handles are ignored
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

impl<P: LocationProvider + ?Sized> LocationProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn subscribe(&mut self, sink: PositionSink, options: WatchOptions) -> SubscriptionHandle {
        (**self).subscribe(sink, options)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        (**self).unsubscribe(handle)
    }
}
