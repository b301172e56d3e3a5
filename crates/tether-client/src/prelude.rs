//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_client::prelude::*;` to import all essential types.

pub use crate::{BridgeClient, CallFuture, ChannelTransport, ClientConfig, ContentTransport};

pub use tether_core::prelude::*;
