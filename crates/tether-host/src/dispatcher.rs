//! Request dispatcher.
//!
//! Turns one inbound request into exactly one response:
//!
//! 1. protocol version check (1001)
//! 2. capability parse (1003)
//! 3. module lookup (2001)
//! 4. operation lookup (2002)
//! 5. handler invocation in its own task; a panic becomes an internal
//!    error (5000)
//!
//! The registry read lock is held only for steps 3-4, never across the
//! handler.

use tether_core::{CallId, Capability, ErrorCode, ProtocolError, Request, Response, codec};
use tracing::{debug, warn};

use crate::registry::SharedRegistry;

/// Validates requests against the registry and invokes their handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
    protocol_version: String,
}

impl Dispatcher {
    /// Create a dispatcher speaking `protocol_version`.
    #[must_use]
    pub fn new(registry: SharedRegistry, protocol_version: impl Into<String>) -> Self {
        Self {
            registry,
            protocol_version: protocol_version.into(),
        }
    }

    /// The negotiated protocol version.
    #[must_use]
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Decode and dispatch a raw request.
    ///
    /// A message that fails structural validation yields a 1002 response if
    /// its `callbackId` can be recovered, and `None` otherwise.
    pub async fn dispatch_raw(&self, raw: &str) -> Option<Response> {
        match codec::decode_request(raw) {
            Ok(request) => Some(self.dispatch(request).await),
            Err(e) => {
                let Some(call_id) = codec::salvage_call_id(raw) else {
                    warn!(error = %e, "Dropping malformed request without callbackId");
                    return None;
                };
                warn!(call_id = %call_id, error = %e, "Rejecting malformed request");
                Some(Response::error(call_id, e.code(), e.to_string()))
            },
        }
    }

    /// Dispatch a decoded request.
    pub async fn dispatch(&self, request: Request) -> Response {
        let Request {
            version,
            capability,
            params,
            call_id,
        } = request;

        if version != self.protocol_version {
            let e = ProtocolError::VersionMismatch {
                expected: self.protocol_version.clone(),
                actual: version,
            };
            debug!(call_id = %call_id, error = %e, "Rejecting request");
            return Response::error(call_id, e.code(), e.to_string());
        }

        let capability = match Capability::parse(&capability) {
            Ok(capability) => capability,
            Err(e) => {
                debug!(call_id = %call_id, error = %e, "Rejecting request");
                return Response::error(call_id, e.code(), e.to_string());
            },
        };

        let handler = {
            let registry = self.registry.read().await;
            let Some(descriptor) = registry.lookup(capability.module()) else {
                debug!(call_id = %call_id, capability = %capability, "Module not found");
                return Response::error(
                    call_id,
                    ErrorCode::MODULE_NOT_FOUND,
                    format!("module not found: {}", capability.module()),
                );
            };
            if !descriptor.supports(capability.method()) {
                debug!(call_id = %call_id, capability = %capability, "Method not found");
                return Response::error(
                    call_id,
                    ErrorCode::METHOD_NOT_FOUND,
                    format!("method not found: {capability}"),
                );
            }
            descriptor.handler()
        };

        debug!(call_id = %call_id, capability = %capability, "Dispatching request");
        let operation = capability.method().to_owned();
        let task = tokio::spawn(async move { handler.handle(&operation, params).await });

        match task.await {
            Ok(Ok(data)) => {
                debug!(call_id = %call_id, capability = %capability, "Request succeeded");
                Response::success(call_id, data)
            },
            Ok(Err(e)) => {
                let code = if e.code.is_success() {
                    ErrorCode::INTERNAL
                } else {
                    e.code
                };
                debug!(
                    call_id = %call_id,
                    capability = %capability,
                    code = %code,
                    "Request failed"
                );
                Response::error(call_id, code, e.message).with_data(e.data)
            },
            Err(e) => internal_fault(call_id, &capability, &e),
        }
    }
}

fn internal_fault(
    call_id: CallId,
    capability: &Capability,
    error: &tokio::task::JoinError,
) -> Response {
    let what = if error.is_panic() {
        "panicked"
    } else {
        "was cancelled"
    };
    warn!(call_id = %call_id, capability = %capability, error = %error, "Module handler {what}");
    Response::error(
        call_id,
        ErrorCode::INTERNAL,
        format!("internal error: {capability} {what}"),
    )
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("protocol_version", &self.protocol_version)
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
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tether_core::Params;

    #[derive(Default)]
    struct Device {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CapabilityModule for Device {
        fn name(&self) -> &str {
            "Device"
        }

        fn operations(&self) -> Vec<String> {
            vec!["info".into(), "crash".into(), "deny".into(), "bogus".into()]
        }

        async fn handle(&self, operation: &str, params: Params) -> ModuleResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match operation {
                "info" => Ok(json!({"model": "test", "echo": params})),
                "deny" => Err(ModuleError::permission_denied("not allowed")
                    .with_data(json!({"permission": "camera"}))),
                "bogus" => Err(ModuleError::new(ErrorCode::SUCCESS, "confused")),
                _ => panic!("device fault"),
            }
        }
    }

    async fn setup() -> (Dispatcher, Arc<Device>) {
        let registry = ModuleRegistry::shared();
        let device = Arc::new(Device::default());
        registry
            .write()
            .await
            .register(ModuleDescriptor::from_arc(Arc::clone(&device)));
        (Dispatcher::new(registry, "1.0"), device)
    }

    fn request(version: &str, capability: &str, id: &str) -> Request {
        Request {
            version: version.into(),
            capability: capability.into(),
            params: Params::new(),
            call_id: CallId::new(id),
        }
    }

    #[tokio::test]
    async fn valid_request_invokes_handler_once() {
        let (dispatcher, device) = setup().await;
        let response = dispatcher.dispatch(request("1.0", "Device.info", "cb_1")).await;
        assert!(response.is_success());
        assert_eq!(response.call_id, CallId::new("cb_1"));
        assert_eq!(response.data["model"], "test");
        assert_eq!(device.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_failures_never_reach_handler() {
        let (dispatcher, device) = setup().await;
        let cases = [
            (request("2.0", "Device.info", "a"), ErrorCode::VERSION_MISMATCH),
            (request("1.0", "Deviceinfo", "b"), ErrorCode::INVALID_CAPABILITY),
            (request("1.0", "Camera.capture", "c"), ErrorCode::MODULE_NOT_FOUND),
            (request("1.0", "Device.reboot", "d"), ErrorCode::METHOD_NOT_FOUND),
        ];
        for (req, expected) in cases {
            let id = req.call_id.clone();
            let response = dispatcher.dispatch(req).await;
            assert_eq!(response.code, expected);
            assert_eq!(response.call_id, id);
        }
        assert_eq!(device.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn module_error_passes_through() {
        let (dispatcher, _) = setup().await;
        let response = dispatcher.dispatch(request("1.0", "Device.deny", "x")).await;
        assert_eq!(response.code, ErrorCode::PERMISSION_DENIED);
        assert_eq!(response.message, "not allowed");
        assert_eq!(response.data["permission"], "camera");
    }

    #[tokio::test]
    async fn error_with_success_code_becomes_internal() {
        let (dispatcher, _) = setup().await;
        let response = dispatcher.dispatch(request("1.0", "Device.bogus", "x")).await;
        assert_eq!(response.code, ErrorCode::INTERNAL);
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let (dispatcher, _) = setup().await;
        let crashed = dispatcher.dispatch(request("1.0", "Device.crash", "p")).await;
        assert_eq!(crashed.code, ErrorCode::INTERNAL);
        assert_eq!(crashed.code.class(), tether_core::ErrorClass::Internal);

        let next = dispatcher.dispatch(request("1.0", "Device.info", "q")).await;
        assert!(next.is_success());
    }

    #[tokio::test]
    async fn malformed_raw_request() {
        let (dispatcher, _) = setup().await;
        let response = dispatcher
            .dispatch_raw(r#"{"version":"1.0","callbackId":"cb_5"}"#)
            .await
            .unwrap();
        assert_eq!(response.code, ErrorCode::MALFORMED_MESSAGE);
        assert_eq!(response.call_id, CallId::new("cb_5"));

        assert!(dispatcher.dispatch_raw("][").await.is_none());
    }

    #[tokio::test]
    async fn raw_request_round_trip() {
        let (dispatcher, _) = setup().await;
        let raw = r#"{"version":"1.0","type":"Device.info","params":{"a":1},"callbackId":"cb_9"}"#;
        let response = dispatcher.dispatch_raw(raw).await.unwrap();
        assert_eq!(response.data["echo"]["a"], 1);
    }
}
