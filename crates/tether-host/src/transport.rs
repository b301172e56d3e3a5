//! Host → content delivery.

use std::sync::{Arc, PoisonError, RwLock};

use tether_core::script::{injection_script, is_valid_receiver_name};
use tether_core::{Event, Response, TransportError, codec};
use tracing::{trace, warn};

use crate::error::{HostError, HostResult};
use crate::executor::ViewExecutor;

/// Global receiver invoked with every encoded response.
pub const DEFAULT_RESPONSE_RECEIVER: &str = "__tetherOnResponse";
/// Global receiver invoked with every encoded event.
pub const DEFAULT_EVENT_RECEIVER: &str = "__tetherOnEvent";

/// The one-way primitive the host injects scripts into the view with.
pub trait HostTransport: Send + Sync {
    /// Evaluate `script` in the content's execution environment.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the view refuses the script.
    fn evaluate_script(&self, script: &str) -> Result<(), TransportError>;
}

/// Encodes outbound messages as receiver invocations and hands them to the
/// view executor.
pub struct ScriptInjector {
    transport: RwLock<Option<Arc<dyn HostTransport>>>,
    executor: Arc<dyn ViewExecutor>,
    response_receiver: String,
    event_receiver: String,
}

impl ScriptInjector {
    /// Create a detached injector.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidReceiver`] if a receiver name is not a
    /// valid script identifier.
    pub fn new(
        executor: Arc<dyn ViewExecutor>,
        response_receiver: impl Into<String>,
        event_receiver: impl Into<String>,
    ) -> HostResult<Self> {
        let response_receiver = response_receiver.into();
        let event_receiver = event_receiver.into();
        for name in [&response_receiver, &event_receiver] {
            if !is_valid_receiver_name(name) {
                return Err(HostError::InvalidReceiver(name.clone()));
            }
        }
        Ok(Self {
            transport: RwLock::new(None),
            executor,
            response_receiver,
            event_receiver,
        })
    }

    /// Attach the outbound transport, replacing any previous one.
    pub fn attach(&self, transport: Arc<dyn HostTransport>) {
        *self.transport.write().unwrap_or_else(PoisonError::into_inner) = Some(transport);
    }

    /// Detach the outbound transport.
    pub fn detach(&self) -> Option<Arc<dyn HostTransport>> {
        self.transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether a transport is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver a response to the response receiver.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Transport`] if no transport is attached, or
    /// [`HostError::Protocol`] if encoding fails.
    pub fn send_response(&self, response: &Response) -> HostResult<()> {
        let json = codec::encode_response(response)?;
        self.inject(&self.response_receiver, &json)
    }

    /// Deliver an event to the event receiver.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Transport`] if no transport is attached, or
    /// [`HostError::Protocol`] if encoding fails.
    pub fn send_event(&self, event: &Event) -> HostResult<()> {
        let json = codec::encode_event(event)?;
        self.inject(&self.event_receiver, &json)
    }

    fn inject(&self, receiver: &str, json: &str) -> HostResult<()> {
        let transport = self
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Detached)?;
        let script = injection_script(receiver, json);
        let receiver = receiver.to_owned();
        self.executor.execute(Box::new(move || {
            match transport.evaluate_script(&script) {
                Ok(()) => trace!(receiver = %receiver, "Script injected"),
                Err(e) => warn!(receiver = %receiver, error = %e, "Script injection failed"),
            }
        }));
        Ok(())
    }
}

impl std::fmt::Debug for ScriptInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptInjector")
            .field("attached", &self.is_attached())
            .field("response_receiver", &self.response_receiver)
            .field("event_receiver", &self.event_receiver)
            .finish_non_exhaustive()
    }
}
