//! Tether Events - Event broadcaster for the Tether view bridge.
//!
//! This crate provides:
//! - Named-event listeners invoked synchronously, in subscription order
//! - Fault isolation: a panicking listener never prevents the others from
//!   running
//! - Broadcast-based async receivers that observe every published event
//!
//! The same broadcaster is used on both sides of the bridge: host-side
//! observers, and content-side listeners fed from the transport.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tether_events::EventBroadcaster;
//!
//! let broadcaster = EventBroadcaster::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&seen);
//! let subscription = broadcaster.subscribe("network.changed", move |_event: &tether_core::Event| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert_eq!(broadcaster.publish("network.changed", serde_json::json!({"online": true})), 1);
//! subscription.unsubscribe();
//! assert_eq!(broadcaster.publish("network.changed", serde_json::Value::Null), 0);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod broadcaster;
mod listener;
mod receiver;

pub use broadcaster::{DEFAULT_CHANNEL_CAPACITY, EventBroadcaster};
pub use listener::{EventListener, SubscriberId, Subscription};
pub use receiver::EventReceiver;
