// src/provider/tasks.rs
//! Bookkeeping for the background task behind each watch

use super::{PositionErrorCode, PositionSink, SubscriptionHandle};
use std::{collections::HashMap, future::Future};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::warn;

#[derive(Debug, Default)]
pub(crate) struct WatchTasks {
    tasks: HashMap<SubscriptionHandle, JoinHandle<()>>,
}

impl WatchTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the task for a new watch and return its handle.
    ///
    /// Without a tokio runtime no task is started and the sink receives
    /// `PositionUnavailable` instead.
    pub fn spawn<W, F>(&mut self, sink: PositionSink, watch: W) -> SubscriptionHandle
    where
        W: FnOnce(PositionSink) -> F,
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|_, task| !task.is_finished());

        let handle = SubscriptionHandle::next();
        match Handle::try_current() {
            Ok(runtime) => {
                self.tasks.insert(handle, runtime.spawn(watch(sink)));
            }
            Err(e) => {
                warn!("Cannot start watch {}: {}", handle, e);
                sink.error(PositionErrorCode::PositionUnavailable);
            }
        }
        handle
    }

    /// Abort the task behind `handle`; returns false if it was unknown
    pub fn abort(&mut self, handle: SubscriptionHandle) -> bool {
        match self.tasks.remove(&handle) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for WatchTasks {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
