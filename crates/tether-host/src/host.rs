//! The host-side context object.

use std::sync::Arc;

use serde_json::Value;
use tether_core::events as reserved;
use tether_core::{Event, LifecycleState, Response, TransportError, Transition};
use tether_events::{EventBroadcaster, Subscription};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::builtin::BridgeModule;
use crate::config::HostConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{HostError, HostResult};
use crate::executor::ViewExecutor;
use crate::lifecycle::LifecycleController;
use crate::module::{CapabilityModule, ModuleDescriptor, ModuleHandle, ModuleKey};
use crate::registry::{ModuleRegistry, SharedRegistry};
use crate::transport::{HostTransport, ScriptInjector};

struct Inner {
    config: HostConfig,
    registry: SharedRegistry,
    dispatcher: Dispatcher,
    injector: ScriptInjector,
    events: EventBroadcaster,
    lifecycle: LifecycleController,
}

/// Host-side bridge: module registry, dispatcher, event broadcaster and
/// lifecycle controller behind one handle.
///
/// Cloning a `BridgeHost` creates a new handle to the same bridge. Any
/// number of independent hosts can coexist.
#[derive(Clone)]
pub struct BridgeHost {
    inner: Arc<Inner>,
}

impl BridgeHost {
    /// Create a host whose view work runs on `executor`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidReceiver`] if a configured receiver name
    /// is not a valid script identifier.
    pub fn new(config: HostConfig, executor: Arc<dyn ViewExecutor>) -> HostResult<Self> {
        let registry = ModuleRegistry::shared();
        let injector = ScriptInjector::new(
            executor,
            config.response_receiver.clone(),
            config.event_receiver.clone(),
        )?;
        Ok(Self {
            inner: Arc::new(Inner {
                dispatcher: Dispatcher::new(Arc::clone(&registry), config.protocol_version.clone()),
                events: EventBroadcaster::with_capacity(config.event_capacity),
                lifecycle: LifecycleController::new(Arc::clone(&registry))
                    .with_hook_timeout(config.hook_timeout),
                injector,
                registry,
                config,
            }),
        })
    }

    /// The host's settings.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    /// The shared module registry.
    #[must_use]
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.inner.registry)
    }

    /// The request dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// The host-side event broadcaster.
    #[must_use]
    pub fn events(&self) -> &EventBroadcaster {
        &self.inner.events
    }

    /// Attach the outbound transport and register the built-in `Bridge`
    /// module, entering [`LifecycleState::Initializing`].
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Lifecycle`] unless the host is uninitialized.
    pub async fn initialize(&self, transport: Arc<dyn HostTransport>) -> HostResult<ModuleHandle> {
        self.inner.lifecycle.begin_initializing()?;
        self.inner.injector.attach(transport);
        let builtin = BridgeModule::new(
            self.inner.config.protocol_version.clone(),
            Arc::downgrade(&self.inner.registry),
        );
        let handle = self
            .inner
            .registry
            .write()
            .await
            .register(ModuleDescriptor::new(builtin));
        debug!("Host initialized");
        Ok(handle)
    }

    /// Mark the bridge ready: run `on_ready` hooks and publish
    /// `bridge.ready`. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Lifecycle`] if the host is not initializing.
    pub async fn mark_ready(&self) -> HostResult<Transition> {
        let transition = self.inner.lifecycle.mark_ready().await?;
        self.announce(transition, reserved::READY);
        Ok(transition)
    }

    /// The host moved to the foreground.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Lifecycle`] before ready or after destruction.
    pub async fn foreground(&self) -> HostResult<Transition> {
        let transition = self.inner.lifecycle.foreground().await?;
        self.announce(transition, reserved::FOREGROUND);
        Ok(transition)
    }

    /// The host moved to the background.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Lifecycle`] before ready or after destruction.
    pub async fn background(&self) -> HostResult<Transition> {
        let transition = self.inner.lifecycle.background().await?;
        self.announce(transition, reserved::BACKGROUND);
        Ok(transition)
    }

    /// Tear the bridge down: unregister every module (running teardown
    /// hooks), publish `bridge.destroyed`, then detach the transport.
    ///
    /// Idempotent; returns `true` only for the call that destroyed it.
    pub async fn destroy(&self) -> bool {
        let transition = self.inner.lifecycle.destroy().await;
        if !transition.is_changed() {
            return false;
        }
        self.announce(transition, reserved::DESTROYED);
        self.inner.injector.detach();
        info!("Host destroyed");
        true
    }

    fn announce(&self, transition: Transition, name: &str) {
        if transition.is_changed() {
            self.broadcast(Event::new(name, Value::Null));
        }
    }

    /// Register a module. Replaces any module registered under the same name.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Destroyed`] after destruction.
    pub async fn register_module<M: CapabilityModule + 'static>(
        &self,
        module: M,
    ) -> HostResult<ModuleHandle> {
        self.register_descriptor(ModuleDescriptor::new(module)).await
    }

    /// Register a prepared descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Destroyed`] after destruction.
    pub async fn register_descriptor(
        &self,
        descriptor: ModuleDescriptor,
    ) -> HostResult<ModuleHandle> {
        if self.state().is_terminal() {
            return Err(HostError::Destroyed);
        }
        Ok(self.inner.registry.write().await.register(descriptor))
    }

    /// Unregister a module, running its teardown hook once the module is
    /// out of the registry. Returns `false` if no such module was registered.
    pub async fn unregister_module(&self, name: &str) -> bool {
        self.inner.lifecycle.unregister(name).await.is_some()
    }

    /// Look a module up as its concrete type.
    pub async fn module<M: CapabilityModule + 'static>(&self, key: ModuleKey<M>) -> Option<Arc<M>> {
        self.inner.registry.read().await.get(key)
    }

    /// Inbound entry point: dispatch a raw request on its own task and
    /// deliver the response.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn receive(&self, raw: impl Into<String>) -> JoinHandle<Option<Response>> {
        let host = self.clone();
        let raw = raw.into();
        tokio::spawn(async move { host.handle_message(&raw).await })
    }

    /// Dispatch a raw request and deliver its response. Returns the
    /// response, or `None` if the message was dropped.
    pub async fn handle_message(&self, raw: &str) -> Option<Response> {
        if self.state().is_terminal() {
            debug!("Dropping request received after destruction");
            return None;
        }
        let response = self.inner.dispatcher.dispatch_raw(raw).await?;
        if let Err(e) = self.inner.injector.send_response(&response) {
            warn!(call_id = %response.call_id, error = %e, "Failed to deliver response");
        }
        Some(response)
    }

    /// Publish an event to host-side listeners and to the content.
    ///
    /// Returns the number of host-side listeners invoked. Without an attached
    /// transport the event stays host-local.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Destroyed`] after destruction.
    pub fn publish_event(&self, name: impl Into<String>, data: Value) -> HostResult<usize> {
        if self.state().is_terminal() {
            return Err(HostError::Destroyed);
        }
        Ok(self.broadcast(Event::new(name, data)))
    }

    fn broadcast(&self, event: Event) -> usize {
        match self.inner.injector.send_event(&event) {
            Ok(()) => {},
            Err(HostError::Transport(TransportError::Detached)) => {
                debug!(event = %event.name, "No transport attached, event stays host-local");
            },
            Err(e) => warn!(event = %event.name, error = %e, "Failed to deliver event"),
        }
        self.inner.events.publish_event(event)
    }

    /// Subscribe a host-side observer to events named `event`.
    pub fn subscribe<F>(&self, event: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(event, listener)
    }
}

impl std::fmt::Debug for BridgeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHost")
            .field("state", &self.state())
            .field("injector", &self.inner.injector)
            .finish_non_exhaustive()
    }
}
