//! Listener trait and subscription handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tether_core::Event;
use uuid::Uuid;

use crate::broadcaster::ListenerTable;

/// A synchronous event listener.
///
/// Listeners run on the publishing thread and should return quickly. For
/// heavier work, take an [`crate::EventReceiver`] instead.
///
/// Any `Fn(&Event) + Send + Sync` closure is a listener.
pub trait EventListener: Send + Sync {
    /// Called for every event published under the subscribed name.
    fn on_event(&self, event: &Event);

    /// Optional name for diagnostics.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> EventListener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event);
    }
}

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A registered listener together with its liveness flag.
///
/// The flag is cleared on unsubscribe so that a publish pass working from a
/// snapshot skips listeners removed after the snapshot was taken.
#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) id: SubscriberId,
    pub(crate) listener: Arc<dyn EventListener>,
    pub(crate) active: Arc<AtomicBool>,
}

/// Handle returned by [`crate::EventBroadcaster::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Self::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    event: String,
    active: Arc<AtomicBool>,
    table: Weak<ListenerTable>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        event: String,
        active: Arc<AtomicBool>,
        table: Weak<ListenerTable>,
    ) -> Self {
        Self {
            id,
            event,
            active,
            table,
        }
    }

    /// The subscription's identifier.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The event name this subscription listens to.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Whether the listener is still subscribed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Remove the listener. Safe to call from inside a listener and safe to
    /// call more than once.
    ///
    /// Returns `true` if this call removed the listener.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Some(table) = self.table.upgrade() {
            table.remove(&self.event, self.id);
        }
        true
    }
}
