//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_host::prelude::*;` to import all essential types.

// Context and modules
pub use crate::{
    BridgeHost, CapabilityModule, HostConfig, ModuleDescriptor, ModuleError, ModuleHandle,
    ModuleKey, ModuleResult, async_trait,
};

// Transport and executors
pub use crate::{HostTransport, InlineExecutor, QueuedExecutor, ViewExecutor, ViewQueue};

// Errors
pub use crate::{HostError, HostResult};

pub use tether_core::prelude::*;
