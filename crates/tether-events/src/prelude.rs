//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_events::prelude::*;` to import all essential types.

pub use crate::{
    DEFAULT_CHANNEL_CAPACITY, EventBroadcaster, EventListener, EventReceiver, SubscriberId,
    Subscription,
};
