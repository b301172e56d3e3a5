//! Lifecycle controller.
//!
//! Owns the host's lifecycle state and fans each transition out to the
//! hooks of every lifecycle-capable module. Event publication and transport
//! handling are left to [`crate::BridgeHost`], which reacts to the
//! [`Transition`] returned here.
//!
//! Hooks never run while the registry lock is held, and each one is bounded
//! by the hook timeout.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tether_core::{Lifecycle, LifecycleError, LifecycleState, Transition};
use tracing::{debug, info};

use crate::module::{DEFAULT_HOOK_TIMEOUT, LifecycleHook, ModuleDescriptor, run_hook};
use crate::registry::SharedRegistry;

/// Sequences lifecycle transitions across the registered modules.
pub struct LifecycleController {
    lifecycle: Mutex<Lifecycle>,
    registry: SharedRegistry,
    hook_timeout: Duration,
}

impl LifecycleController {
    /// Create a controller in [`LifecycleState::Uninitialized`].
    #[must_use]
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle::new()),
            registry,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    /// Bound every hook by `timeout`.
    #[must_use]
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// The per-hook time limit.
    #[must_use]
    pub fn hook_timeout(&self) -> Duration {
        self.hook_timeout
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle().state()
    }

    fn transition(&self, to: LifecycleState) -> Result<Transition, LifecycleError> {
        let transition = self.lifecycle().transition(to)?;
        match transition {
            Transition::Changed { from, to } => {
                info!(from = %from, to = %to, "Host lifecycle transition");
            },
            Transition::Unchanged(state) => {
                debug!(state = %state, requested = %to, "Lifecycle transition is a no-op");
            },
        }
        Ok(transition)
    }

    /// Enter [`LifecycleState::Initializing`].
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless uninitialized.
    pub fn begin_initializing(&self) -> Result<Transition, LifecycleError> {
        self.transition(LifecycleState::Initializing)
    }

    /// Enter [`LifecycleState::Ready`] and run `on_ready` hooks. A second
    /// call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] if not initializing.
    pub async fn mark_ready(&self) -> Result<Transition, LifecycleError> {
        self.transition_with_hook(LifecycleState::Ready, LifecycleHook::Ready)
            .await
    }

    /// Enter [`LifecycleState::Active`] and run `on_foreground` hooks.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] before ready or after
    /// destruction.
    pub async fn foreground(&self) -> Result<Transition, LifecycleError> {
        self.transition_with_hook(LifecycleState::Active, LifecycleHook::Foreground)
            .await
    }

    /// Enter [`LifecycleState::Backgrounded`] and run `on_background` hooks.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] before ready or after
    /// destruction.
    pub async fn background(&self) -> Result<Transition, LifecycleError> {
        self.transition_with_hook(LifecycleState::Backgrounded, LifecycleHook::Background)
            .await
    }

    /// Enter [`LifecycleState::Destroyed`] and unregister every module,
    /// running teardown hooks. Idempotent.
    pub async fn destroy(&self) -> Transition {
        let transition = match self.transition(LifecycleState::Destroyed) {
            Ok(transition) => transition,
            // Every state has an edge to Destroyed.
            Err(_) => Transition::Unchanged(LifecycleState::Destroyed),
        };
        if transition.is_changed() {
            let drained = self.registry.write().await.drain();
            let removed = drained.len();
            for descriptor in drained {
                self.teardown(&descriptor).await;
            }
            debug!(removed, "Modules torn down");
        }
        transition
    }

    /// Remove `name` from the registry, then run its teardown hook if it is
    /// lifecycle-capable. Returns the removed descriptor.
    pub async fn unregister(&self, name: &str) -> Option<ModuleDescriptor> {
        let removed = self.registry.write().await.remove(name)?;
        self.teardown(&removed).await;
        info!(module = name, "Unregistered module");
        Some(removed)
    }

    async fn teardown(&self, descriptor: &ModuleDescriptor) {
        if descriptor.lifecycle_capable() {
            run_hook(
                descriptor.name(),
                descriptor.handler(),
                LifecycleHook::Teardown,
                self.hook_timeout,
            )
            .await;
        }
    }

    async fn transition_with_hook(
        &self,
        to: LifecycleState,
        hook: LifecycleHook,
    ) -> Result<Transition, LifecycleError> {
        let transition = self.transition(to)?;
        if transition.is_changed() {
            self.run_hooks(hook).await;
        }
        Ok(transition)
    }

    async fn run_hooks(&self, hook: LifecycleHook) {
        let modules = self.registry.read().await.lifecycle_capable();
        for descriptor in modules {
            run_hook(descriptor.name(), descriptor.handler(), hook, self.hook_timeout).await;
        }
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state())
            .field("hook_timeout", &self.hook_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ModuleError, ModuleResult};
    use crate::module::{CapabilityModule, ModuleDescriptor};
    use crate::registry::ModuleRegistry;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tether_core::Params;

    #[derive(Default)]
    struct Tracer {
        log: Mutex<Vec<&'static str>>,
        fail_background: bool,
    }

    #[async_trait]
    impl CapabilityModule for Tracer {
        fn name(&self) -> &str {
            "Tracer"
        }

        fn operations(&self) -> Vec<String> {
            Vec::new()
        }

        async fn handle(&self, _operation: &str, _params: Params) -> ModuleResult<Value> {
            Ok(Value::Null)
        }

        fn lifecycle_capable(&self) -> bool {
            true
        }

        async fn on_ready(&self) -> ModuleResult<()> {
            self.log.lock().unwrap().push("ready");
            Ok(())
        }

        async fn on_foreground(&self) -> ModuleResult<()> {
            self.log.lock().unwrap().push("foreground");
            Ok(())
        }

        async fn on_background(&self) -> ModuleResult<()> {
            self.log.lock().unwrap().push("background");
            if self.fail_background {
                return Err(ModuleError::internal("busy"));
            }
            Ok(())
        }

        async fn on_teardown(&self) -> ModuleResult<()> {
            self.log.lock().unwrap().push("teardown");
            Ok(())
        }
    }

    async fn controller(tracer: Tracer) -> (LifecycleController, Arc<Tracer>, SharedRegistry) {
        let registry = ModuleRegistry::shared();
        let tracer = Arc::new(tracer);
        registry
            .write()
            .await
            .register(ModuleDescriptor::from_arc(Arc::clone(&tracer)));
        (LifecycleController::new(Arc::clone(&registry)), tracer, registry)
    }

    #[tokio::test]
    async fn hooks_follow_transitions() {
        let (controller, tracer, registry) = controller(Tracer::default()).await;
        controller.begin_initializing().unwrap();
        assert!(controller.mark_ready().await.unwrap().is_changed());
        assert!(!controller.mark_ready().await.unwrap().is_changed());
        controller.foreground().await.unwrap();
        assert!(!controller.foreground().await.unwrap().is_changed());
        controller.background().await.unwrap();
        assert!(controller.destroy().await.is_changed());
        assert!(!controller.destroy().await.is_changed());

        assert_eq!(
            *tracer.log.lock().unwrap(),
            vec!["ready", "foreground", "background", "teardown"]
        );
        assert!(registry.read().await.is_empty());
    }

    #[tokio::test]
    async fn hook_failure_does_not_abort_transition() {
        let (controller, _tracer, _registry) = controller(Tracer {
            fail_background: true,
            ..Tracer::default()
        })
        .await;
        controller.begin_initializing().unwrap();
        controller.mark_ready().await.unwrap();
        controller.background().await.unwrap();
        assert_eq!(controller.state(), LifecycleState::Backgrounded);
    }

    #[tokio::test]
    async fn cannot_foreground_before_ready() {
        let (controller, tracer, _registry) = controller(Tracer::default()).await;
        assert!(controller.foreground().await.is_err());
        controller.begin_initializing().unwrap();
        assert!(controller.foreground().await.is_err());
        assert!(tracer.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn destroyed_rejects_everything_else() {
        let (controller, _tracer, _registry) = controller(Tracer::default()).await;
        controller.destroy().await;
        assert!(controller.begin_initializing().is_err());
        assert!(controller.mark_ready().await.is_err());
        assert!(controller.background().await.is_err());
    }

    /// Misbehaving hooks: teardown that reads the registry, or hooks that
    /// never return.
    struct Sticky {
        name: &'static str,
        registry: std::sync::Weak<tokio::sync::RwLock<ModuleRegistry>>,
        seen_modules: Mutex<Option<usize>>,
        hang_teardown: bool,
        teardown_started: Arc<tokio::sync::Notify>,
    }

    impl Sticky {
        fn new(name: &'static str, registry: &SharedRegistry) -> Self {
            Self {
                name,
                registry: Arc::downgrade(registry),
                seen_modules: Mutex::new(None),
                hang_teardown: false,
                teardown_started: Arc::new(tokio::sync::Notify::new()),
            }
        }
    }

    #[async_trait]
    impl CapabilityModule for Sticky {
        fn name(&self) -> &str {
            self.name
        }

        fn operations(&self) -> Vec<String> {
            vec!["get".into()]
        }

        async fn handle(&self, _operation: &str, _params: Params) -> ModuleResult<Value> {
            Ok(Value::from(self.name))
        }

        fn lifecycle_capable(&self) -> bool {
            true
        }

        async fn on_background(&self) -> ModuleResult<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn on_teardown(&self) -> ModuleResult<()> {
            self.teardown_started.notify_one();
            if self.hang_teardown {
                std::future::pending::<()>().await;
            }
            if let Some(registry) = self.registry.upgrade() {
                let count = registry.read().await.len();
                *self.seen_modules.lock().unwrap() = Some(count);
            }
            Ok(())
        }
    }

    async fn ready(registry: &SharedRegistry) -> LifecycleController {
        let controller = LifecycleController::new(Arc::clone(registry))
            .with_hook_timeout(Duration::from_millis(500));
        controller.begin_initializing().unwrap();
        controller.mark_ready().await.unwrap();
        controller
    }

    #[tokio::test]
    async fn teardown_may_read_the_registry() {
        let registry = ModuleRegistry::shared();
        let sticky = Arc::new(Sticky::new("Reader", &registry));
        registry
            .write()
            .await
            .register(ModuleDescriptor::from_arc(Arc::clone(&sticky)));
        let controller = ready(&registry).await;

        let destroyed = tokio::time::timeout(Duration::from_secs(2), controller.destroy()).await;
        assert!(destroyed.unwrap().is_changed());
        assert_eq!(*sticky.seen_modules.lock().unwrap(), Some(0));
    }

    #[tokio::test]
    async fn unregister_teardown_may_read_the_registry() {
        let registry = ModuleRegistry::shared();
        let sticky = Arc::new(Sticky::new("Reader", &registry));
        registry
            .write()
            .await
            .register(ModuleDescriptor::from_arc(Arc::clone(&sticky)));
        let controller = ready(&registry).await;

        let removed =
            tokio::time::timeout(Duration::from_secs(2), controller.unregister("Reader")).await;
        assert!(removed.unwrap().is_some());
        assert_eq!(*sticky.seen_modules.lock().unwrap(), Some(0));
        assert!(controller.unregister("Reader").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_teardown_does_not_block_other_dispatches() {
        let registry = ModuleRegistry::shared();
        let mut stuck = Sticky::new("Stuck", &registry);
        stuck.hang_teardown = true;
        let started = Arc::clone(&stuck.teardown_started);
        {
            let mut guard = registry.write().await;
            guard.register(ModuleDescriptor::new(stuck));
            guard.register(ModuleDescriptor::new(Sticky::new("Other", &registry)));
        }
        let controller = Arc::new(ready(&registry).await);
        let dispatcher = crate::Dispatcher::new(Arc::clone(&registry), "1.0");

        let unregistering = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.unregister("Stuck").await.is_some() }
        });
        started.notified().await;

        let before = tokio::time::Instant::now();
        let raw = r#"{"version":"1.0","type":"Other.get","params":{},"callbackId":"cb_1"}"#;
        let response = dispatcher.dispatch_raw(raw).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.data, Value::from("Other"));
        assert!(before.elapsed() < controller.hook_timeout());
        assert!(!unregistering.is_finished());

        assert!(unregistering.await.unwrap());
        assert_eq!(registry.read().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_hook_cannot_stall_a_transition() {
        let registry = ModuleRegistry::shared();
        registry
            .write()
            .await
            .register(ModuleDescriptor::new(Sticky::new("Stuck", &registry)));
        let controller = ready(&registry).await;

        let started = tokio::time::Instant::now();
        let transition = controller.background().await.unwrap();
        assert!(transition.is_changed());
        assert_eq!(controller.state(), LifecycleState::Backgrounded);
        assert!(started.elapsed() >= controller.hook_timeout());
    }
}
