// src/tracker/state.rs
//! Display state of the tracker and its transitions

use crate::provider::{Position, PositionErrorCode};

pub const TITLE: &str = "Geolocation";
pub const SUBTITLE: &str = "Tracking my location";
pub const NOT_SUPPORTED_MESSAGE: &str = "Geolocation is not supported by this device.";
pub const STOPPED_MESSAGE: &str = "Tracking stopped.";
pub const WAITING_MESSAGE: &str = "Waiting for location...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    #[default]
    Idle,
    Active,
}

/// Something that happened to the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Start was requested but the provider cannot report location
    Unsupported,
    /// A new watch was created
    Started,
    /// Tracking was stopped, with or without a live watch
    Stopped,
    PositionReceived(Position),
    PositionFailed(PositionErrorCode),
}

/// Which control the front end should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    StartTracking,
    StopTracking,
}

impl Control {
    pub fn label(&self) -> &'static str {
        match self {
            Control::StartTracking => "Start Tracking",
            Control::StopTracking => "Stop Tracking",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Normal,
    Error,
}

/// Everything a front end needs to draw the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerView {
    pub control: Control,
    pub status: String,
    pub tone: StatusTone,
}

/// Tracking state plus the two display strings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub tracking: TrackingState,
    pub location_text: String,
    pub error_text: String,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a transition in place
    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Unsupported => {
                self.error_text = NOT_SUPPORTED_MESSAGE.to_string();
            }
            Transition::Started => {
                self.tracking = TrackingState::Active;
                self.error_text.clear();
            }
            Transition::Stopped => {
                self.tracking = TrackingState::Idle;
                self.location_text = STOPPED_MESSAGE.to_string();
            }
            Transition::PositionReceived(position) => {
                self.location_text = format_position(&position);
                self.error_text.clear();
            }
            Transition::PositionFailed(code) => {
                self.error_text = code.message().to_string();
                self.location_text.clear();
            }
        }
    }

    /// Consume the state and return the one after `transition`
    pub fn next(mut self, transition: Transition) -> Self {
        self.apply(transition);
        self
    }

    pub fn is_active(&self) -> bool {
        self.tracking == TrackingState::Active
    }

    /// Project the state onto controls and status line
    pub fn view(&self) -> TrackerView {
        let control = match self.tracking {
            TrackingState::Idle => Control::StartTracking,
            TrackingState::Active => Control::StopTracking,
        };

        let (status, tone) = if !self.error_text.is_empty() {
            (self.error_text.clone(), StatusTone::Error)
        } else if !self.location_text.is_empty() {
            (self.location_text.clone(), StatusTone::Normal)
        } else {
            (WAITING_MESSAGE.to_string(), StatusTone::Normal)
        };

        TrackerView { control, status, tone }
    }
}

/// Format a fix the way the status line shows it
pub fn format_position(position: &Position) -> String {
    format!("Latitude: {}, Longitude: {}", position.latitude, position.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_view() {
        let view = TrackerState::new().view();
        assert_eq!(view.control, Control::StartTracking);
        assert_eq!(view.status, WAITING_MESSAGE);
        assert_eq!(view.tone, StatusTone::Normal);
    }

    #[test]
    fn test_format_position() {
        let position = Position::new(37.7749, -122.4194);
        assert_eq!(format_position(&position), "Latitude: 37.7749, Longitude: -122.4194");

        let position = Position::new(0.0, 10.5);
        assert_eq!(format_position(&position), "Latitude: 0, Longitude: 10.5");
    }

    #[test]
    fn test_error_takes_precedence() {
        let state = TrackerState {
            tracking: TrackingState::Active,
            location_text: "Latitude: 1, Longitude: 2".to_string(),
            error_text: PositionErrorCode::Other.message().to_string(),
        };

        let view = state.view();
        assert_eq!(view.status, "An unknown error occurred.");
        assert_eq!(view.tone, StatusTone::Error);
        assert_eq!(view.control, Control::StopTracking);
    }

    #[test]
    fn test_error_clears_location_and_success_clears_error() {
        let state = TrackerState::new()
            .next(Transition::Started)
            .next(Transition::PositionReceived(Position::new(1.5, 2.5)))
            .next(Transition::PositionFailed(PositionErrorCode::PositionUnavailable));

        assert!(state.location_text.is_empty());
        assert_eq!(state.error_text, "Location information is unavailable.");
        assert!(state.is_active());

        let state = state.next(Transition::PositionReceived(Position::new(3.0, 4.0)));
        assert!(state.error_text.is_empty());
        assert_eq!(state.view().status, "Latitude: 3, Longitude: 4");
    }

    #[test]
    fn test_every_error_message() {
        let cases = [
            (PositionErrorCode::PermissionDenied, "User denied the request for Geolocation."),
            (PositionErrorCode::PositionUnavailable, "Location information is unavailable."),
            (PositionErrorCode::Timeout, "The request to get user location timed out."),
            (PositionErrorCode::Other, "An unknown error occurred."),
        ];

        for (code, message) in cases {
            let state = TrackerState::new().next(Transition::PositionFailed(code));
            assert_eq!(state.view().status, message);
        }
    }

    #[test]
    fn test_unsupported_keeps_idle() {
        let state = TrackerState::new().next(Transition::Unsupported);
        assert_eq!(state.tracking, TrackingState::Idle);
        assert_eq!(state.view().status, NOT_SUPPORTED_MESSAGE);
        assert_eq!(state.view().tone, StatusTone::Error);
    }

    #[test]
    fn test_restart_clears_error_but_keeps_stopped_text() {
        let state = TrackerState::new()
            .next(Transition::Started)
            .next(Transition::PositionFailed(PositionErrorCode::Timeout))
            .next(Transition::Stopped)
            .next(Transition::Started);

        assert!(state.error_text.is_empty());
        assert_eq!(state.view().status, STOPPED_MESSAGE);
        assert_eq!(state.view().control, Control::StopTracking);
    }
}
