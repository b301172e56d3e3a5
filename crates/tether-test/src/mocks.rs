//! Mock implementations for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tether_client::ContentTransport;
use tether_core::script::parse_injection_script;
use tether_core::{Event, Params, Request, Response, TransportError, codec};
use tether_host::{CapabilityModule, HostTransport, LifecycleHook, ModuleError, ModuleResult};

/// Host → content transport that records every injected script.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingHostTransport {
    scripts: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<TransportError>>>,
}

impl RecordingHostTransport {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent injection fail with `error`.
    pub fn fail_with(&self, error: TransportError) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = Some(error);
        }
    }

    /// Stop failing injections.
    pub fn recover(&self) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = None;
        }
    }

    /// Raw scripts, in injection order.
    #[must_use]
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// `(receiver, json)` pairs, in injection order.
    #[must_use]
    pub fn injections(&self) -> Vec<(String, String)> {
        self.scripts()
            .iter()
            .filter_map(|script| parse_injection_script(script))
            .collect()
    }

    /// Every injected response.
    #[must_use]
    pub fn responses(&self) -> Vec<Response> {
        self.injections()
            .iter()
            .filter_map(|(_, json)| codec::decode_response(json).ok())
            .collect()
    }

    /// Every injected event.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.injections()
            .iter()
            .filter_map(|(_, json)| codec::decode_event(json).ok())
            .collect()
    }

    /// Names of every injected event.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.scripts.lock() {
            guard.clear();
        }
    }
}

impl HostTransport for RecordingHostTransport {
    fn evaluate_script(&self, script: &str) -> Result<(), TransportError> {
        if let Ok(guard) = self.failure.lock()
            && let Some(error) = guard.as_ref()
        {
            return Err(error.clone());
        }
        if let Ok(mut guard) = self.scripts.lock() {
            guard.push(script.to_owned());
        }
        Ok(())
    }
}

/// Content → host transport that records every posted message.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingContentTransport {
    messages: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<TransportError>>>,
}

impl RecordingContentTransport {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent post fail with `error`.
    pub fn fail_with(&self, error: TransportError) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = Some(error);
        }
    }

    /// Stop failing posts.
    pub fn recover(&self) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = None;
        }
    }

    /// Raw posted messages, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Posted messages that decode as requests.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.messages()
            .iter()
            .filter_map(|raw| codec::decode_request(raw).ok())
            .collect()
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<Request> {
        self.requests().pop()
    }
}

impl ContentTransport for RecordingContentTransport {
    fn post_message(&self, message: &str) -> Result<(), TransportError> {
        if let Ok(guard) = self.failure.lock()
            && let Some(error) = guard.as_ref()
        {
            return Err(error.clone());
        }
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message.to_owned());
        }
        Ok(())
    }
}

/// Scriptable capability module.
///
/// Declared operations without a configured reply echo their params back.
/// Clones share the call log.
#[derive(Debug, Clone)]
pub struct MockModule {
    name: String,
    operations: Vec<String>,
    replies: HashMap<String, ModuleResult<Value>>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<(String, Params)>>>,
}

impl MockModule {
    /// Create a module with no operations.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
            replies: HashMap::new(),
            delays: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn declare(&mut self, operation: &str) {
        if !self.operations.iter().any(|op| op == operation) {
            self.operations.push(operation.to_owned());
        }
    }

    /// Declare an operation that echoes its params.
    #[must_use]
    pub fn with_operation(mut self, operation: &str) -> Self {
        self.declare(operation);
        self
    }

    /// Declare an operation that succeeds with `data`.
    #[must_use]
    pub fn with_reply(mut self, operation: &str, data: Value) -> Self {
        self.declare(operation);
        self.replies.insert(operation.to_owned(), Ok(data));
        self
    }

    /// Declare an operation that fails with `error`.
    #[must_use]
    pub fn with_error(mut self, operation: &str, error: ModuleError) -> Self {
        self.declare(operation);
        self.replies.insert(operation.to_owned(), Err(error));
        self
    }

    /// Delay `operation` by `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, operation: &str, delay: Duration) -> Self {
        self.declare(operation);
        self.delays.insert(operation.to_owned(), delay);
        self
    }

    /// Every `(operation, params)` the module was invoked with.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|g| g.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CapabilityModule for MockModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<String> {
        self.operations.clone()
    }

    async fn handle(&self, operation: &str, params: Params) -> ModuleResult<Value> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((operation.to_owned(), params.clone()));
        }
        if let Some(delay) = self.delays.get(operation) {
            tokio::time::sleep(*delay).await;
        }
        match self.replies.get(operation) {
            Some(reply) => reply.clone(),
            None => Ok(Value::Object(params)),
        }
    }
}

/// A module whose every operation panics.
#[derive(Debug, Clone)]
pub struct PanickingModule {
    name: String,
    operations: Vec<String>,
}

impl PanickingModule {
    /// Create a module exposing `operations`.
    #[must_use]
    pub fn new(name: impl Into<String>, operations: &[&str]) -> Self {
        Self {
            name: name.into(),
            operations: operations.iter().map(|op| (*op).to_owned()).collect(),
        }
    }
}

#[async_trait]
impl CapabilityModule for PanickingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<String> {
        self.operations.clone()
    }

    async fn handle(&self, operation: &str, _params: Params) -> ModuleResult<Value> {
        panic!("{}.{operation} exploded", self.name);
    }
}

/// A lifecycle-capable module recording which hooks ran.
///
/// Clones share the hook log.
#[derive(Debug, Clone)]
pub struct HookTracer {
    name: String,
    hooks: Arc<Mutex<Vec<LifecycleHook>>>,
    failing: Option<LifecycleHook>,
    panicking: Option<LifecycleHook>,
    stuck: Vec<LifecycleHook>,
}

impl HookTracer {
    /// Create a tracer with no faults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: Arc::new(Mutex::new(Vec::new())),
            failing: None,
            panicking: None,
            stuck: Vec::new(),
        }
    }

    /// Make `hook` return an error.
    #[must_use]
    pub fn with_failing_hook(mut self, hook: LifecycleHook) -> Self {
        self.failing = Some(hook);
        self
    }

    /// Make `hook` panic.
    #[must_use]
    pub fn with_panicking_hook(mut self, hook: LifecycleHook) -> Self {
        self.panicking = Some(hook);
        self
    }

    /// Make `hook` never return. May be given several times.
    #[must_use]
    pub fn with_stuck_hook(mut self, hook: LifecycleHook) -> Self {
        self.stuck.push(hook);
        self
    }

    /// Hooks that ran, in order, including ones that failed.
    #[must_use]
    pub fn hooks(&self) -> Vec<LifecycleHook> {
        self.hooks.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// How many times `hook` ran.
    #[must_use]
    pub fn count(&self, hook: LifecycleHook) -> usize {
        self.hooks().into_iter().filter(|h| *h == hook).count()
    }

    async fn record(&self, hook: LifecycleHook) -> ModuleResult<()> {
        if let Ok(mut guard) = self.hooks.lock() {
            guard.push(hook);
        }
        if self.stuck.contains(&hook) {
            std::future::pending::<()>().await;
        }
        if self.panicking == Some(hook) {
            panic!("{} {} panicked", self.name, hook.as_str());
        }
        if self.failing == Some(hook) {
            return Err(ModuleError::internal(format!("{} failed", hook.as_str())));
        }
        Ok(())
    }
}

#[async_trait]
impl CapabilityModule for HookTracer {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<String> {
        vec!["hooks".into()]
    }

    async fn handle(&self, _operation: &str, _params: Params) -> ModuleResult<Value> {
        let names: Vec<Value> = self
            .hooks()
            .into_iter()
            .map(|h| Value::from(h.as_str()))
            .collect();
        Ok(Value::Array(names))
    }

    fn lifecycle_capable(&self) -> bool {
        true
    }

    async fn on_ready(&self) -> ModuleResult<()> {
        self.record(LifecycleHook::Ready).await
    }

    async fn on_foreground(&self) -> ModuleResult<()> {
        self.record(LifecycleHook::Foreground).await
    }

    async fn on_background(&self) -> ModuleResult<()> {
        self.record(LifecycleHook::Background).await
    }

    async fn on_teardown(&self) -> ModuleResult<()> {
        self.record(LifecycleHook::Teardown).await
    }
}
