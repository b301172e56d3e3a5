//! The content-side bridge client.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tether_core::codec;
use tether_core::events as reserved;
use tether_core::{
    BridgeError, Capability, Lifecycle, LifecycleError, LifecycleState, Params, Request,
    Transition,
};
use tether_events::{EventBroadcaster, Subscription};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::correlator::{CallFuture, Correlator};
use crate::transport::ContentTransport;

/// Content-side context object: issues calls, receives responses and
/// events, and tracks the bridge lifecycle.
///
/// Any number of clients can coexist; share one between tasks behind an
/// `Arc`.
pub struct BridgeClient {
    config: ClientConfig,
    correlator: Correlator,
    events: EventBroadcaster,
    lifecycle: Mutex<Lifecycle>,
    transport: RwLock<Option<Arc<dyn ContentTransport>>>,
}

impl BridgeClient {
    /// Create a client in the [`LifecycleState::Uninitialized`] state.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            correlator: Correlator::new(config.call_id_prefix.clone()),
            events: EventBroadcaster::with_capacity(config.event_capacity),
            lifecycle: Mutex::new(Lifecycle::new()),
            transport: RwLock::new(None),
            config,
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_transport(&self) -> Option<Arc<dyn ContentTransport>> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The client's settings.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle().state()
    }

    /// Number of calls awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    /// The content-side event broadcaster.
    #[must_use]
    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Attach the outbound transport. Moves an uninitialized client to
    /// [`LifecycleState::Initializing`]; in later states it replaces the
    /// current transport.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] once destroyed.
    pub fn attach_transport(
        &self,
        transport: Arc<dyn ContentTransport>,
    ) -> Result<(), LifecycleError> {
        {
            let mut lifecycle = self.lifecycle();
            match lifecycle.state() {
                LifecycleState::Destroyed => {
                    return Err(LifecycleError::InvalidTransition {
                        from: LifecycleState::Destroyed,
                        to: LifecycleState::Initializing,
                    });
                },
                LifecycleState::Uninitialized => {
                    lifecycle.transition(LifecycleState::Initializing)?;
                },
                _ => {},
            }
        }
        *self.transport.write().unwrap_or_else(PoisonError::into_inner) = Some(transport);
        debug!("Content transport attached");
        Ok(())
    }

    /// Detach the outbound transport. Later calls reject as not supported.
    pub fn detach_transport(&self) -> Option<Arc<dyn ContentTransport>> {
        let previous = self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("Content transport detached");
        }
        previous
    }

    /// Mark the bridge ready. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] before initialization
    /// or after destruction.
    pub fn mark_ready(&self) -> Result<Transition, LifecycleError> {
        self.transition(LifecycleState::Ready)
    }

    fn transition(&self, to: LifecycleState) -> Result<Transition, LifecycleError> {
        let transition = self.lifecycle().transition(to)?;
        if let Transition::Changed { from, to } = transition {
            info!(from = %from, to = %to, "Client lifecycle transition");
        }
        Ok(transition)
    }

    /// Call `capability` with the default deadline.
    ///
    /// See [`Self::call_with_timeout`].
    pub fn call(&self, capability: &str, params: Params) -> CallFuture {
        self.call_with_timeout(capability, params, self.config.default_timeout)
    }

    /// Call `capability` (`Module.Method`) with `params`.
    ///
    /// The request is posted before this method returns; awaiting the
    /// returned future yields the host's payload, or a [`BridgeError`]
    /// carrying the exact code and message of an error response. Calls are
    /// rejected without reaching the transport before the bridge is ready,
    /// after it is destroyed, or while no transport is attached.
    pub fn call_with_timeout(
        &self,
        capability: &str,
        params: Params,
        timeout: Duration,
    ) -> CallFuture {
        let state = self.state();
        if state.is_terminal() {
            return CallFuture::rejected(BridgeError::Destroyed);
        }
        if !state.accepts_calls() {
            debug!(capability, state = %state, "Call rejected: bridge not ready");
            return CallFuture::rejected(BridgeError::NotReady { state });
        }
        let Some(transport) = self.current_transport() else {
            debug!(capability, "Call rejected: no transport attached");
            return CallFuture::rejected(BridgeError::NotSupported);
        };
        let parsed = match Capability::parse(capability) {
            Ok(parsed) => parsed,
            Err(e) => return CallFuture::rejected(e.into()),
        };

        let (call_id, future) = match self.correlator.register(capability, timeout) {
            Ok(registered) => registered,
            Err(error) => return CallFuture::rejected(error),
        };
        // A destroy or reload that ran since the check above may already have
        // drained the pending set; settle the call here instead of leaking it.
        let state = self.state();
        if !state.accepts_calls() {
            let error = if state.is_terminal() {
                BridgeError::Destroyed
            } else {
                BridgeError::NotReady { state }
            };
            debug!(call_id = %call_id, capability, state = %state, "Call raced a teardown");
            self.correlator.fail(&call_id, error);
            return future;
        }
        let request = Request::new(
            self.config.protocol_version.clone(),
            &parsed,
            params,
            call_id.clone(),
        );
        let sent = codec::encode_request(&request)
            .map_err(BridgeError::from)
            .and_then(|wire| transport.post_message(&wire).map_err(BridgeError::from));
        if let Err(error) = sent {
            warn!(call_id = %call_id, capability, error = %error, "Failed to post request");
            self.correlator.fail(&call_id, error);
        }
        future
    }

    /// Entry point for the response receiver.
    ///
    /// Returns `true` if the response settled a pending call. Malformed and
    /// stale responses are dropped.
    pub fn handle_response(&self, raw: &str) -> bool {
        match codec::decode_response(raw) {
            Ok(response) => self.correlator.resolve(response),
            Err(e) => {
                warn!(error = %e, "Dropping malformed response");
                false
            },
        }
    }

    /// Entry point for the event receiver.
    ///
    /// Reserved lifecycle events update the client's state before listeners
    /// run. Returns the number of listeners invoked.
    pub fn handle_event(&self, raw: &str) -> usize {
        let event = match codec::decode_event(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed event");
                return 0;
            },
        };

        if let Some(state) = reserved::lifecycle_state_for(&event.name) {
            self.follow_host(state);
        }
        self.events.publish_event(event)
    }

    fn follow_host(&self, state: LifecycleState) {
        if state == LifecycleState::Destroyed {
            self.destroy();
            return;
        }
        if let Err(e) = self.transition(state) {
            debug!(error = %e, "Ignoring lifecycle event");
        }
    }

    /// Subscribe to a host event.
    pub fn subscribe<F>(&self, event: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&tether_core::Event) + Send + Sync + 'static,
    {
        self.events.subscribe(event, listener)
    }

    /// Cancel every pending call with `reason`. Returns the number cancelled.
    pub fn cancel_all(&self, reason: &str) -> usize {
        self.correlator.cancel_all(reason)
    }

    /// The content reloaded: cancel every pending call and return to
    /// [`LifecycleState::Initializing`]. The transport stays attached.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] once destroyed.
    pub fn reload(&self) -> Result<usize, LifecycleError> {
        let transition = self.lifecycle().reload()?;
        if let Transition::Changed { from, to } = transition {
            info!(from = %from, to = %to, "Content reloaded");
        }
        Ok(self.correlator.cancel_all("content reloaded"))
    }

    /// Tear the client down: cancel all pending calls and detach the
    /// transport. Further calls reject. Idempotent.
    ///
    /// Returns the number of calls cancelled.
    pub fn destroy(&self) -> usize {
        let transition = match self.lifecycle().transition(LifecycleState::Destroyed) {
            Ok(transition) => transition,
            Err(e) => {
                // Every state has an edge to Destroyed.
                warn!(error = %e, "Unexpected destroy failure");
                return 0;
            },
        };
        let Transition::Changed { from, .. } = transition else {
            return 0;
        };
        let cancelled = self.correlator.cancel_all("bridge destroyed");
        self.detach_transport();
        info!(from = %from, cancelled, "Client destroyed");
        cancelled
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}
