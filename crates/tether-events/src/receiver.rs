//! Async receivers.

use std::sync::Arc;

use tether_core::Event;
use tokio::sync::broadcast;
use tracing::warn;

/// Receiver for events from an [`crate::EventBroadcaster`].
///
/// Sees every published event, optionally narrowed to one name.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<Event>>,
    name: Option<String>,
}

impl EventReceiver {
    pub(crate) fn new(receiver: broadcast::Receiver<Arc<Event>>, name: Option<String>) -> Self {
        Self { receiver, name }
    }

    fn matches(&self, event: &Event) -> bool {
        self.name.as_deref().is_none_or(|name| name == event.name)
    }

    /// Receive the next event.
    ///
    /// A receiver that falls more than the channel capacity behind skips the
    /// dropped events with a warning. Returns `None` once every broadcaster
    /// handle has been dropped.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive an already-published event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(_) => return None,
            }
        }
    }
}

impl std::fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReceiver")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
