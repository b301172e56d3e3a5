//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_core::prelude::*;` to import all essential types.

// Wire messages
pub use crate::{CallId, Capability, Event, Params, Request, Response};

// Codes and errors
pub use crate::{BridgeError, BridgeResult, ErrorClass, ErrorCode, ProtocolError, TransportError};

// Lifecycle
pub use crate::{Lifecycle, LifecycleError, LifecycleState, Transition};
