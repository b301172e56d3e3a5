//! Tether Test - Shared test utilities for the Tether view bridge.
//!
//! This crate provides mock transports, mock capability modules and a
//! loopback harness wiring a real [`tether_client::BridgeClient`] to a real
//! [`tether_host::BridgeHost`]. Use it as a dev-dependency.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tether_test::{Loopback, MockModule};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn round_trip() {
//!     let bridge = Loopback::start().await;
//!     bridge
//!         .host
//!         .register_module(MockModule::new("Echo").with_reply("say", json!("hi")))
//!         .await
//!         .unwrap();
//!
//!     let reply = bridge.client.call("Echo.say", Default::default()).await;
//!     assert_eq!(reply.unwrap(), json!("hi"));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
