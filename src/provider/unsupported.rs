// src/provider/unsupported.rs
//! Stand-in provider for platforms without a usable location source

use super::{LocationProvider, PositionSink, SubscriptionHandle, WatchOptions};
use tracing::warn;

/// Provider that reports itself as unsupported and never delivers a fix
#[derive(Debug, Clone)]
pub struct UnsupportedProvider {
    reason: String,
}

impl UnsupportedProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl LocationProvider for UnsupportedProvider {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn subscribe(&mut self, _sink: PositionSink, _options: WatchOptions) -> SubscriptionHandle {
        warn!("Subscribe called on unsupported provider: {}", self.reason);
        SubscriptionHandle::next()
    }

    fn unsubscribe(&mut self, _handle: SubscriptionHandle) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_supported() {
        let provider = UnsupportedProvider::new("no receiver");
        assert!(!provider.is_supported());
        assert_eq!(provider.name(), "unsupported");
    }

    #[test]
    fn test_subscribe_returns_fresh_handles() {
        let mut provider = UnsupportedProvider::new("no receiver");
        let (sink, mut rx) = PositionSink::channel();
        let a = provider.subscribe(sink.clone(), WatchOptions::default());
        let b = provider.subscribe(sink, WatchOptions::default());
        assert_ne!(a, b);
        assert!(rx.try_recv().is_err());
    }
}
