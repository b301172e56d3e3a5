//! Tether Core - Wire protocol and shared types for the Tether view bridge.
//!
//! This crate provides:
//! - The three wire message shapes (`Request`, `Response`, `Event`)
//! - Status codes and their error classes
//! - The protocol codec with structural validation
//! - Script-injection helpers for the host → content direction
//! - The bridge lifecycle state machine
//!
//! It has no knowledge of transports, modules or timers. Both the content
//! side (`tether-client`) and the host side (`tether-host`) build on it.
//!
//! # Example
//!
//! ```rust
//! use tether_core::codec;
//! use tether_core::{CallId, ErrorCode, Response};
//!
//! let response = Response::success(CallId::new("cb_1"), serde_json::json!({"ok": true}));
//! let wire = codec::encode_response(&response).unwrap();
//!
//! let decoded = codec::decode_response(&wire).unwrap();
//! assert_eq!(decoded.code, ErrorCode::SUCCESS);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod events;
pub mod prelude;
pub mod script;

mod code;
mod error;
mod lifecycle;
mod protocol;

pub use code::{ErrorClass, ErrorCode};
pub use error::{BridgeError, BridgeResult, LifecycleError, ProtocolError, TransportError};
pub use lifecycle::{Lifecycle, LifecycleState, Transition};
pub use protocol::{
    CallId, Capability, DEFAULT_PROTOCOL_VERSION, Event, Params, Request, Response,
};
