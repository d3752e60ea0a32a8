// src/provider/windows.rs
//! Windows Location Services provider

use super::{
    LocationProvider, Position, PositionErrorCode, PositionSink, SubscriptionHandle, WatchOptions,
};
use crate::error::Result;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::{info, warn};
use windows::{
    Devices::Geolocation::*,
    Foundation::TimeSpan,
};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

const E_ACCESSDENIED: u32 = 0x8007_0005;
const HRESULT_TIMEOUT: u32 = 0x8007_05B4;

/// Convert a duration into 100ns `TimeSpan` ticks
fn time_span(duration: Duration) -> TimeSpan {
    TimeSpan {
        Duration: (duration.as_nanos() / 100) as i64,
    }
}

fn error_code(error: &windows::core::Error) -> PositionErrorCode {
    match error.code().0 as u32 {
        E_ACCESSDENIED => PositionErrorCode::PermissionDenied,
        HRESULT_TIMEOUT => PositionErrorCode::Timeout,
        _ => PositionErrorCode::PositionUnavailable,
    }
}

/// Ask the user for location access
fn request_location_access() -> std::result::Result<(), PositionErrorCode> {
    let status = Geolocator::RequestAccessAsync()
        .and_then(|op| op.get())
        .map_err(|e| error_code(&e))?;

    match status {
        GeolocationAccessStatus::Allowed => Ok(()),
        GeolocationAccessStatus::Denied => Err(PositionErrorCode::PermissionDenied),
        _ => Err(PositionErrorCode::Other),
    }
}

/// Create and configure a Windows Geolocator
fn create_geolocator(high_accuracy: bool) -> Result<Geolocator> {
    let geolocator = Geolocator::new()?;

    let desired_accuracy = if high_accuracy {
        PositionAccuracy::High
    } else {
        PositionAccuracy::Default
    };
    geolocator.SetDesiredAccuracy(desired_accuracy)?;

    // Set movement threshold (1 meter)
    geolocator.SetMovementThreshold(1.0)?;

    Ok(geolocator)
}

/// Request one position honoring the watch's age and timeout limits
fn request_position(
    geolocator: &Geolocator,
    options: &WatchOptions,
) -> std::result::Result<Position, PositionErrorCode> {
    let geoposition = geolocator
        .GetGeopositionAsyncWithAgeAndTimeout(time_span(options.maximum_age), time_span(options.timeout))
        .and_then(|op| op.get())
        .map_err(|e| error_code(&e))?;

    let coordinate = geoposition.Coordinate().map_err(|e| error_code(&e))?;
    let point = coordinate
        .Point()
        .and_then(|point| point.Position())
        .map_err(|e| error_code(&e))?;

    let mut position = Position::new(point.Latitude, point.Longitude);
    if point.Altitude != 0.0 {
        position.altitude = Some(point.Altitude);
    }
    position.accuracy = coordinate.Accuracy().ok();

    Ok(position)
}

fn run_watch(sink: PositionSink, options: WatchOptions, running: Arc<AtomicBool>) {
    if let Err(code) = request_location_access() {
        warn!("Location access not granted: {}", code);
        sink.error(code);
        return;
    }

    let geolocator = match create_geolocator(options.high_accuracy) {
        Ok(geolocator) => geolocator,
        Err(e) => {
            warn!("Failed to create geolocator: {}", e);
            sink.error(PositionErrorCode::PositionUnavailable);
            return;
        }
    };

    while running.load(Ordering::Relaxed) {
        let delivered = match request_position(&geolocator, &options) {
            Ok(position) => sink.success(position),
            Err(code) => sink.error(code),
        };

        if !delivered {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Location provider backed by Windows Location Services
#[derive(Default)]
pub struct WindowsProvider {
    watches: HashMap<SubscriptionHandle, Arc<AtomicBool>>,
}

impl WindowsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocationProvider for WindowsProvider {
    fn name(&self) -> &str {
        "windows"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn subscribe(&mut self, sink: PositionSink, options: WatchOptions) -> SubscriptionHandle {
        let handle = SubscriptionHandle::next();
        let running = Arc::new(AtomicBool::new(true));

        let running_clone = Arc::clone(&running);
        thread::spawn(move || run_watch(sink, options, running_clone));

        self.watches.insert(handle, running);
        info!("Started Windows location watch {}", handle);
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if let Some(running) = self.watches.remove(&handle) {
            running.store(false, Ordering::Relaxed);
            info!("Stopped Windows location watch {}", handle);
        }
    }
}

impl Drop for WindowsProvider {
    fn drop(&mut self) {
        for (_, running) in self.watches.drain() {
            running.store(false, Ordering::Relaxed);
        }
    }
}
