//! Event broadcaster.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tether_core::Event;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::listener::{EventListener, ListenerEntry, SubscriberId, Subscription};
use crate::receiver::EventReceiver;

/// Default channel capacity for async receivers.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Listeners keyed by event name, each list in subscription order.
#[derive(Default)]
pub(crate) struct ListenerTable {
    by_name: RwLock<HashMap<String, Vec<ListenerEntry>>>,
}

impl ListenerTable {
    fn insert(&self, event: &str, entry: ListenerEntry) {
        let mut by_name = self.by_name.write().unwrap_or_else(PoisonError::into_inner);
        by_name.entry(event.to_owned()).or_default().push(entry);
    }

    pub(crate) fn remove(&self, event: &str, id: SubscriberId) {
        let mut by_name = self.by_name.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = by_name.get_mut(event) {
            entries.retain(|entry| entry.id != id);
            if entries.is_empty() {
                by_name.remove(event);
            }
        }
        debug!(event, "Listener unsubscribed");
    }

    fn snapshot(&self, event: &str) -> Vec<ListenerEntry> {
        let by_name = self.by_name.read().unwrap_or_else(PoisonError::into_inner);
        by_name.get(event).cloned().unwrap_or_default()
    }

    fn count(&self, event: &str) -> usize {
        let by_name = self.by_name.read().unwrap_or_else(PoisonError::into_inner);
        by_name.get(event).map_or(0, Vec::len)
    }

    fn clear(&self) {
        let mut by_name = self.by_name.write().unwrap_or_else(PoisonError::into_inner);
        for entry in by_name.values().flatten() {
            entry.active.store(false, Ordering::Release);
        }
        by_name.clear();
    }
}

/// Fans named events out to listeners and async receivers.
///
/// Clones share the same listeners and channel.
///
/// Listeners are invoked from a snapshot taken when the publish pass starts,
/// with no lock held, so a listener may subscribe, unsubscribe or publish
/// without deadlocking. A listener unsubscribed mid-pass is skipped if it has
/// not been reached yet.
#[derive(Clone)]
pub struct EventBroadcaster {
    table: Arc<ListenerTable>,
    sender: broadcast::Sender<Arc<Event>>,
    capacity: usize,
}

impl EventBroadcaster {
    /// Create a broadcaster with the default receiver capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a broadcaster whose async receivers buffer up to `capacity`
    /// events. A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            table: Arc::new(ListenerTable::default()),
            sender,
            capacity,
        }
    }

    /// Subscribe a closure to events named `event`.
    pub fn subscribe<F>(&self, event: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe_listener(event, Arc::new(listener))
    }

    /// Subscribe a shared listener to events named `event`.
    pub fn subscribe_listener(
        &self,
        event: impl Into<String>,
        listener: Arc<dyn EventListener>,
    ) -> Subscription {
        let event = event.into();
        let id = SubscriberId::new();
        let active = Arc::new(AtomicBool::new(true));
        debug!(event = %event, listener = listener.name(), "Listener subscribed");
        self.table.insert(
            &event,
            ListenerEntry {
                id,
                listener,
                active: Arc::clone(&active),
            },
        );
        Subscription::new(id, event, active, Arc::downgrade(&self.table))
    }

    /// Publish an event built from `name` and `data`.
    ///
    /// Returns the number of listeners invoked.
    pub fn publish(&self, name: impl Into<String>, data: Value) -> usize {
        self.publish_event(Event::new(name, data))
    }

    /// Publish an event to its listeners and to every async receiver.
    ///
    /// Returns the number of listeners invoked, including any that panicked.
    pub fn publish_event(&self, event: Event) -> usize {
        let event = Arc::new(event);
        // No receivers is fine.
        let _ = self.sender.send(Arc::clone(&event));

        let listeners = self.table.snapshot(&event.name);
        if listeners.is_empty() {
            trace!(event = %event.name, "No listeners for event");
            return 0;
        }

        let mut invoked: usize = 0;
        for entry in listeners {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            invoked = invoked.saturating_add(1);
            let result = catch_unwind(AssertUnwindSafe(|| entry.listener.on_event(&event)));
            if let Err(panic) = result {
                warn!(
                    event = %event.name,
                    listener = entry.listener.name(),
                    subscriber_id = ?entry.id,
                    panic = panic_message(panic.as_ref()),
                    "Event listener panicked"
                );
            }
        }
        trace!(event = %event.name, invoked, "Event published");
        invoked
    }

    /// Get an async receiver that sees every published event.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Get an async receiver that sees only events named `event`.
    #[must_use]
    pub fn receiver_for(&self, event: impl Into<String>) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(event.into()))
    }

    /// Number of listeners subscribed to `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.table.count(event)
    }

    /// Remove every listener. Outstanding [`Subscription`] handles become
    /// inactive.
    pub fn clear(&self) {
        self.table.clear();
        debug!("All listeners cleared");
    }

    /// Async receiver channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("capacity", &self.capacity)
            .field("receivers", &self.sender.receiver_count())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .by_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ListenerTable")
            .field("event_names", &names)
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
