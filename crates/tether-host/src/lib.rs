//! Tether Host - Host side of the Tether view bridge.
//!
//! This crate provides:
//! - The [`CapabilityModule`] contract and the [`ModuleRegistry`]
//! - The [`Dispatcher`], turning each request into exactly one response
//! - [`ViewExecutor`]s and the [`ScriptInjector`] for host → content delivery
//! - The [`LifecycleController`] and the built-in `Bridge` module
//! - [`BridgeHost`], the context object tying them together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tether_host::{BridgeHost, HostConfig, HostTransport, InlineExecutor};
//! use tether_core::TransportError;
//!
//! struct WebView;
//!
//! impl HostTransport for WebView {
//!     fn evaluate_script(&self, _script: &str) -> Result<(), TransportError> {
//!         // hand the script to the platform view
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), tether_host::HostError> {
//! let host = BridgeHost::new(HostConfig::default(), Arc::new(InlineExecutor))?;
//! host.initialize(Arc::new(WebView)).await?;
//! host.mark_ready().await?;
//!
//! // Wire the view's message handler to `host.receive(raw)`.
//! let response = host
//!     .handle_message(r#"{"version":"1.0","type":"Bridge.ping","callbackId":"cb_1"}"#)
//!     .await;
//! assert!(response.is_some_and(|r| r.is_success()));
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

mod builtin;
mod config;
mod dispatcher;
mod error;
mod executor;
mod host;
mod lifecycle;
mod module;
mod registry;
mod transport;

pub use builtin::{BRIDGE_MODULE, BridgeModule};
pub use config::HostConfig;
pub use dispatcher::Dispatcher;
pub use error::{HostError, HostResult, ModuleError, ModuleResult};
pub use executor::{InlineExecutor, QueuedExecutor, ViewExecutor, ViewQueue, ViewTask};
pub use host::BridgeHost;
pub use lifecycle::LifecycleController;
pub use module::{
    CapabilityModule, DEFAULT_HOOK_TIMEOUT, LifecycleHook, ModuleDescriptor, ModuleHandle,
    ModuleKey,
};
pub use registry::{ModuleRegistry, SharedRegistry};
pub use transport::{
    DEFAULT_EVENT_RECEIVER, DEFAULT_RESPONSE_RECEIVER, HostTransport, ScriptInjector,
};

/// Re-exported so module implementations don't need a direct dependency.
pub use async_trait::async_trait;
