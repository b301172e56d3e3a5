//! Capability module contract and descriptors.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tether_core::Params;
use tracing::{debug, warn};

use crate::error::ModuleResult;

/// A named group of capabilities exposed to content.
///
/// `handle` completes exactly once with a payload or a [`ModuleError`]; a
/// panic inside it is contained by the dispatcher and reported as an
/// internal error.
///
/// Modules that care about the bridge lifecycle return `true` from
/// [`Self::lifecycle_capable`] and override the hooks they need.
///
/// [`ModuleError`]: crate::ModuleError
#[async_trait]
pub trait CapabilityModule: Send + Sync {
    /// Stable module name, the part of a capability before the `.`.
    fn name(&self) -> &str;

    /// Names of the supported operations.
    fn operations(&self) -> Vec<String>;

    /// Run `operation` with `params`.
    async fn handle(&self, operation: &str, params: Params) -> ModuleResult<Value>;

    /// Whether the lifecycle hooks should be invoked.
    fn lifecycle_capable(&self) -> bool {
        false
    }

    /// The bridge became ready.
    async fn on_ready(&self) -> ModuleResult<()> {
        Ok(())
    }

    /// The host moved to the foreground.
    async fn on_foreground(&self) -> ModuleResult<()> {
        Ok(())
    }

    /// The host moved to the background.
    async fn on_background(&self) -> ModuleResult<()> {
        Ok(())
    }

    /// The module is being unregistered.
    async fn on_teardown(&self) -> ModuleResult<()> {
        Ok(())
    }
}

/// A lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    /// [`CapabilityModule::on_ready`]
    Ready,
    /// [`CapabilityModule::on_foreground`]
    Foreground,
    /// [`CapabilityModule::on_background`]
    Background,
    /// [`CapabilityModule::on_teardown`]
    Teardown,
}

impl LifecycleHook {
    /// Hook name for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "on_ready",
            Self::Foreground => "on_foreground",
            Self::Background => "on_background",
            Self::Teardown => "on_teardown",
        }
    }
}

/// Default upper bound on a single lifecycle hook.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `hook` on `module` in its own task, bounded by `timeout`.
///
/// Failures, panics and overruns are logged and contained; an overrunning
/// hook is aborted. Returns `true` if the hook completed successfully.
pub(crate) async fn run_hook(
    name: &str,
    module: Arc<dyn CapabilityModule>,
    hook: LifecycleHook,
    timeout: Duration,
) -> bool {
    let mut task = tokio::spawn(async move {
        match hook {
            LifecycleHook::Ready => module.on_ready().await,
            LifecycleHook::Foreground => module.on_foreground().await,
            LifecycleHook::Background => module.on_background().await,
            LifecycleHook::Teardown => module.on_teardown().await,
        }
    });
    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(Ok(()))) => {
            debug!(module = name, hook = hook.as_str(), "Lifecycle hook completed");
            true
        },
        Ok(Ok(Err(e))) => {
            warn!(module = name, hook = hook.as_str(), error = %e, "Lifecycle hook failed");
            false
        },
        Ok(Err(e)) => {
            warn!(module = name, hook = hook.as_str(), error = %e, "Lifecycle hook panicked");
            false
        },
        Err(_) => {
            task.abort();
            warn!(
                module = name,
                hook = hook.as_str(),
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Lifecycle hook timed out"
            );
            false
        },
    }
}

/// Tagged handle for one registration.
///
/// The generation increases with every registration, so a handle held across
/// a re-registration under the same name is detectably stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHandle {
    name: String,
    generation: u64,
}

impl ModuleHandle {
    pub(crate) fn new(name: String, generation: u64) -> Self {
        Self { name, generation }
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.generation)
    }
}

/// Typed key for looking a module up as its concrete type.
pub struct ModuleKey<M> {
    name: &'static str,
    _module: PhantomData<fn() -> M>,
}

impl<M> ModuleKey<M> {
    /// A key for the module registered under `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _module: PhantomData,
        }
    }

    /// The module name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<M> Clone for ModuleKey<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for ModuleKey<M> {}

impl<M> fmt::Debug for ModuleKey<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleKey").field(&self.name).finish()
    }
}

/// Everything the registry knows about one module.
#[derive(Clone)]
pub struct ModuleDescriptor {
    name: String,
    operations: BTreeSet<String>,
    handler: Arc<dyn CapabilityModule>,
    concrete: Arc<dyn Any + Send + Sync>,
    lifecycle_capable: bool,
}

impl ModuleDescriptor {
    /// Describe `module`, capturing its name, operations and lifecycle flag.
    #[must_use]
    pub fn new<M: CapabilityModule + 'static>(module: M) -> Self {
        Self::from_arc(Arc::new(module))
    }

    /// Describe a shared module.
    #[must_use]
    pub fn from_arc<M: CapabilityModule + 'static>(module: Arc<M>) -> Self {
        let concrete: Arc<dyn Any + Send + Sync> = module.clone();
        Self {
            name: module.name().to_owned(),
            operations: module.operations().into_iter().collect(),
            lifecycle_capable: module.lifecycle_capable(),
            handler: module,
            concrete,
        }
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Supported operations, sorted.
    #[must_use]
    pub fn operations(&self) -> &BTreeSet<String> {
        &self.operations
    }

    /// Whether `operation` is supported.
    #[must_use]
    pub fn supports(&self, operation: &str) -> bool {
        self.operations.contains(operation)
    }

    /// Whether lifecycle hooks are invoked for this module.
    #[must_use]
    pub fn lifecycle_capable(&self) -> bool {
        self.lifecycle_capable
    }

    /// The dispatch handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn CapabilityModule> {
        Arc::clone(&self.handler)
    }

    /// The module as its concrete type, if it is an `M`.
    #[must_use]
    pub fn downcast<M: CapabilityModule + 'static>(&self) -> Option<Arc<M>> {
        Arc::clone(&self.concrete).downcast::<M>().ok()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("operations", &self.operations)
            .field("lifecycle_capable", &self.lifecycle_capable)
            .finish_non_exhaustive()
    }
}
