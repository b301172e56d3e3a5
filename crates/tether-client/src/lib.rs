//! Tether Client - Content side of the Tether view bridge.
//!
//! This crate provides:
//! - [`BridgeClient`], the context object content code calls through
//! - The callback correlator: call identifiers, deadlines and settlement
//! - The [`ContentTransport`] seam the client posts requests through
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tether_client::{BridgeClient, ChannelTransport, ClientConfig};
//! use tether_core::Params;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BridgeClient::new(ClientConfig::default());
//! let (transport, _outbound) = ChannelTransport::new();
//! client.attach_transport(Arc::new(transport))?;
//! client.mark_ready()?;
//!
//! // Responses come back through `client.handle_response(raw)`.
//! let pong = client.call("Bridge.ping", Params::new()).await?;
//! assert_eq!(pong["pong"], true);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod client;
mod config;
mod correlator;
mod transport;

pub use client::BridgeClient;
pub use config::{ClientConfig, DEFAULT_CALL_TIMEOUT};
pub use correlator::{CallFuture, Correlator, DEFAULT_CALL_ID_PREFIX};
pub use transport::{ChannelTransport, ContentTransport};
