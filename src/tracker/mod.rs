// src/tracker/mod.rs
//! Location tracker coordinating one provider watch with start/stop controls

pub mod state;

pub use state::{Control, StatusTone, TrackerState, TrackerView, TrackingState, Transition};

use crate::provider::{
    LocationProvider, Position, PositionErrorCode, PositionSink, SubscriptionHandle, WatchEvent,
    WatchOptions,
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info};

/// The live watch: its handle and the receiving end of its callbacks
struct ActiveWatch {
    handle: SubscriptionHandle,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    closed: bool,
}

/// Tracks device location through an injected provider.
///
/// At most one watch is live at a time. Dropping the tracker cancels it.
pub struct LocationTracker<P: LocationProvider> {
    provider: P,
    options: WatchOptions,
    state: TrackerState,
    watch: Option<ActiveWatch>,
}

impl<P: LocationProvider> LocationTracker<P> {
    /// Create an idle tracker using the default watch options
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, WatchOptions::default())
    }

    pub fn with_options(provider: P, options: WatchOptions) -> Self {
        Self {
            provider,
            options,
            state: TrackerState::new(),
            watch: None,
        }
    }

    /// Start tracking; a no-op while a watch is already live
    pub fn start_tracking(&mut self) {
        if !self.provider.is_supported() {
            info!("Provider {} does not support location", self.provider.name());
            self.state.apply(Transition::Unsupported);
            return;
        }

        if self.watch.is_some() {
            debug!("Already tracking, ignoring start");
            return;
        }

        let (sink, events) = PositionSink::channel();
        let handle = self.provider.subscribe(sink, self.options);
        info!("Tracking started via {} ({})", self.provider.name(), handle);

        self.watch = Some(ActiveWatch {
            handle,
            events,
            closed: false,
        });
        self.state.apply(Transition::Started);
    }

    /// Stop tracking; safe to call while idle
    pub fn stop_tracking(&mut self) {
        if let Some(watch) = self.watch.take() {
            self.provider.unsubscribe(watch.handle);
            info!("Tracking stopped ({})", watch.handle);
        }
        self.state.apply(Transition::Stopped);
    }

    /// Activate whichever control is currently shown
    pub fn toggle(&mut self) {
        match self.view().control {
            Control::StartTracking => self.start_tracking(),
            Control::StopTracking => self.stop_tracking(),
        }
    }

    /// Success callback
    pub fn on_success(&mut self, position: Position) {
        debug!("Position {}, {}", position.latitude, position.longitude);
        self.state.apply(Transition::PositionReceived(position));
    }

    /// Error callback
    pub fn on_error(&mut self, code: PositionErrorCode) {
        debug!("Position error: {:?}", code);
        self.state.apply(Transition::PositionFailed(code));
    }

    fn handle_event(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Success(position) => self.on_success(position),
            WatchEvent::Error(code) => self.on_error(code),
        }
    }

    /// Apply every callback already delivered by the provider.
    ///
    /// Returns how many were applied. Suited to immediate-mode front ends
    /// that poll once per frame.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let event = match self.watch.as_mut() {
                Some(watch) if !watch.closed => match watch.events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        watch.closed = true;
                        break;
                    }
                },
                _ => break,
            };
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next callback and apply it.
    ///
    /// Pends forever while idle or once the provider has ended the watch, so
    /// it can sit in a `select!` next to user input.
    pub async fn next_update(&mut self) {
        let event = match self.watch.as_mut() {
            Some(watch) if !watch.closed => match watch.events.recv().await {
                Some(event) => event,
                None => {
                    debug!("Provider ended watch {}", watch.handle);
                    watch.closed = true;
                    return;
                }
            },
            _ => std::future::pending().await,
        };
        self.handle_event(event);
    }

    pub fn view(&self) -> TrackerView {
        self.state.view()
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.state.tracking
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_active()
    }

    /// Handle of the live watch, if any
    pub fn subscription(&self) -> Option<SubscriptionHandle> {
        self.watch.as_ref().map(|watch| watch.handle)
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: LocationProvider> Drop for LocationTracker<P> {
    fn drop(&mut self) {
        if let Some(watch) = self.watch.take() {
            self.provider.unsubscribe(watch.handle);
            info!("Tracker dropped, cancelled {}", watch.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::UnsupportedProvider;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeLog {
        subscribed: Vec<(SubscriptionHandle, WatchOptions)>,
        unsubscribed: Vec<SubscriptionHandle>,
        sinks: Vec<PositionSink>,
    }

    /// Provider that records calls and lets tests fire callbacks by hand
    #[derive(Clone, Default)]
    struct FakeProvider {
        log: Arc<Mutex<FakeLog>>,
    }

    impl FakeProvider {
        fn subscribe_count(&self) -> usize {
            self.log.lock().unwrap().subscribed.len()
        }

        fn unsubscribed(&self) -> Vec<SubscriptionHandle> {
            self.log.lock().unwrap().unsubscribed.clone()
        }

        fn sink(&self) -> PositionSink {
            self.log.lock().unwrap().sinks.last().cloned().unwrap()
        }
    }

    impl LocationProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        fn is_supported(&self) -> bool {
            true
        }

        fn subscribe(&mut self, sink: PositionSink, options: WatchOptions) -> SubscriptionHandle {
            let handle = SubscriptionHandle::next();
            let mut log = self.log.lock().unwrap();
            log.subscribed.push((handle, options));
            log.sinks.push(sink);
            handle
        }

        fn unsubscribe(&mut self, handle: SubscriptionHandle) {
            self.log.lock().unwrap().unsubscribed.push(handle);
        }
    }

    fn tracker() -> (LocationTracker<FakeProvider>, FakeProvider) {
        let provider = FakeProvider::default();
        (LocationTracker::new(provider.clone()), provider)
    }

    #[test]
    fn test_unsupported_provider_never_subscribes() {
        let mut tracker = LocationTracker::new(UnsupportedProvider::new("test"));
        tracker.start_tracking();

        assert_eq!(tracker.tracking_state(), TrackingState::Idle);
        assert_eq!(tracker.subscription(), None);
        assert_eq!(tracker.view().status, state::NOT_SUPPORTED_MESSAGE);
        assert_eq!(tracker.view().tone, StatusTone::Error);
        assert_eq!(tracker.view().control, Control::StartTracking);
    }

    #[test]
    fn test_start_uses_fresh_high_accuracy_watch() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();

        let log = provider.log.lock().unwrap();
        let (_, options) = log.subscribed[0];
        assert!(options.high_accuracy);
        assert_eq!(options.maximum_age, std::time::Duration::ZERO);
        assert_eq!(options.timeout, std::time::Duration::from_millis(1000));
    }

    #[test]
    fn test_double_start_subscribes_once() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();
        let first = tracker.subscription();
        tracker.start_tracking();

        assert_eq!(provider.subscribe_count(), 1);
        assert_eq!(tracker.subscription(), first);
        assert!(tracker.is_tracking());
        assert_eq!(tracker.view().control, Control::StopTracking);
    }

    #[test]
    fn test_stop_while_idle() {
        let (mut tracker, provider) = tracker();
        tracker.stop_tracking();

        assert!(provider.unsubscribed().is_empty());
        assert_eq!(tracker.tracking_state(), TrackingState::Idle);
        assert_eq!(tracker.view().status, "Tracking stopped.");
    }

    #[test]
    fn test_success_callback_formats_and_clears_error() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();

        let sink = provider.sink();
        sink.error(PositionErrorCode::PermissionDenied);
        sink.success(Position::new(37.7749, -122.4194));
        assert_eq!(tracker.process_pending(), 2);

        assert!(tracker.state().error_text.is_empty());
        assert_eq!(tracker.view().status, "Latitude: 37.7749, Longitude: -122.4194");
        assert_eq!(tracker.view().tone, StatusTone::Normal);
    }

    #[test]
    fn test_timeout_keeps_tracking() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();
        tracker.on_success(Position::new(1.0, 2.0));

        provider.sink().error(PositionErrorCode::Timeout);
        tracker.process_pending();

        assert_eq!(tracker.view().status, "The request to get user location timed out.");
        assert!(tracker.state().location_text.is_empty());
        assert_eq!(tracker.tracking_state(), TrackingState::Active);
        assert!(tracker.subscription().is_some());
        assert!(provider.unsubscribed().is_empty());
    }

    #[test]
    fn test_start_success_stop() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();
        let handle = tracker.subscription().unwrap();

        provider.sink().success(Position::new(48.117, 11.517));
        tracker.process_pending();
        tracker.stop_tracking();

        assert_eq!(tracker.view().status, "Tracking stopped.");
        assert_eq!(tracker.subscription(), None);
        assert_eq!(provider.unsubscribed(), vec![handle]);
        assert_eq!(tracker.view().control, Control::StartTracking);
    }

    #[test]
    fn test_events_after_stop_are_not_applied() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();
        let sink = provider.sink();
        tracker.stop_tracking();

        assert!(!sink.success(Position::new(1.0, 1.0)));
        assert_eq!(tracker.process_pending(), 0);
        assert_eq!(tracker.view().status, "Tracking stopped.");
    }

    #[test]
    fn test_restart_creates_new_watch() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();
        let first = tracker.subscription().unwrap();
        tracker.stop_tracking();
        tracker.start_tracking();

        assert_eq!(provider.subscribe_count(), 2);
        assert_ne!(tracker.subscription(), Some(first));
    }

    #[test]
    fn test_toggle_follows_visible_control() {
        let (mut tracker, provider) = tracker();
        tracker.toggle();
        assert!(tracker.is_tracking());
        tracker.toggle();
        assert!(!tracker.is_tracking());
        assert_eq!(provider.unsubscribed().len(), 1);
    }

    #[test]
    fn test_drop_while_active_cancels_watch() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();
        let handle = tracker.subscription().unwrap();
        let sink = provider.sink();

        drop(tracker);

        assert_eq!(provider.unsubscribed(), vec![handle]);
        assert!(sink.is_closed());
        assert!(!sink.success(Position::new(1.0, 1.0)));
    }

    #[test]
    fn test_drop_while_idle_does_not_unsubscribe() {
        let (tracker, provider) = tracker();
        drop(tracker);
        assert!(provider.unsubscribed().is_empty());
    }

    #[tokio::test]
    async fn test_next_update_applies_in_order() {
        let (mut tracker, provider) = tracker();
        tracker.start_tracking();

        let sink = provider.sink();
        sink.success(Position::new(1.0, 2.0));
        sink.error(PositionErrorCode::PositionUnavailable);

        tracker.next_update().await;
        assert_eq!(tracker.view().status, "Latitude: 1, Longitude: 2");

        tracker.next_update().await;
        assert_eq!(tracker.view().status, "Location information is unavailable.");
    }

    #[tokio::test]
    async fn test_next_update_pends_while_idle() {
        let (mut tracker, _provider) = tracker();
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            tracker.next_update(),
        )
        .await;
        assert!(result.is_err());
    }
}
