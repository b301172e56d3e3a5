//! Host-side dispatch: every request yields exactly one response.

mod common;

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde_json::{Value, json};
use tether_core::{ErrorClass, ErrorCode, LifecycleState, Params};
use tether_host::{
    BridgeHost, CapabilityModule, HostConfig, InlineExecutor, LifecycleHook, ModuleError,
    ModuleRegistry, ModuleResult, async_trait,
};
use tether_test::{
    HookTracer, MockModule, PanickingModule, RecordingHostTransport, test_request,
    test_request_json, test_request_json_versioned,
};

use common::ready_host;

#[tokio::test]
async fn each_failure_class_yields_one_response_with_its_code() {
    let (host, view) = ready_host().await;
    host.register_module(
        MockModule::new("Device")
            .with_reply("info", json!({"model": "test"}))
            .with_error("vibrate", ModuleError::device_restricted("no motor")),
    )
    .await
    .unwrap();

    let cases = [
        (
            test_request_json_versioned("9.9", "Device.info", "v"),
            ErrorCode::VERSION_MISMATCH,
        ),
        (test_request_json("Deviceinfo", "c"), ErrorCode::INVALID_CAPABILITY),
        (test_request_json("Camera.snap", "m"), ErrorCode::MODULE_NOT_FOUND),
        (test_request_json("Device.reboot", "o"), ErrorCode::METHOD_NOT_FOUND),
        (test_request_json("Device.vibrate", "d"), ErrorCode::DEVICE_RESTRICTED),
        (test_request_json("Device.info", "s"), ErrorCode::SUCCESS),
    ];

    for (raw, expected) in &cases {
        let response = host.handle_message(raw).await.unwrap();
        assert_eq!(response.code, *expected, "request {raw}");
    }

    let delivered = view.responses();
    assert_eq!(delivered.len(), cases.len());
    let ids: Vec<&str> = delivered.iter().map(|r| r.call_id.as_str()).collect();
    assert_eq!(ids, vec!["v", "c", "m", "o", "d", "s"]);
}

#[tokio::test]
async fn decoded_requests_are_validated_too() {
    let (host, view) = ready_host().await;
    let dispatcher = host.dispatcher();

    let bad = dispatcher.dispatch(test_request("Bridge", "cb_1")).await;
    assert_eq!(bad.code, ErrorCode::INVALID_CAPABILITY);
    let empty_method = dispatcher.dispatch(test_request("Bridge.", "cb_2")).await;
    assert_eq!(empty_method.code, ErrorCode::INVALID_CAPABILITY);
    let pong = dispatcher.dispatch(test_request("Bridge.ping", "cb_3")).await;
    assert!(pong.is_success());

    assert!(view.responses().is_empty());
}

#[tokio::test]
async fn module_errors_reach_the_wire_verbatim() {
    let (host, _view) = ready_host().await;
    host.register_module(MockModule::new("Camera").with_error(
        "capture",
        ModuleError::permission_denied("user said no").with_data(json!({"retry": false})),
    ))
    .await
    .unwrap();

    let response = host
        .handle_message(&test_request_json("Camera.capture", "cb_9"))
        .await
        .unwrap();
    assert_eq!(response.code, ErrorCode::PERMISSION_DENIED);
    assert_eq!(response.code.class(), ErrorClass::Permission);
    assert_eq!(response.message, "user said no");
    assert_eq!(response.data, json!({"retry": false}));
}

#[tokio::test]
async fn malformed_messages_answer_only_when_an_id_is_recoverable() {
    let (host, view) = ready_host().await;

    let salvaged = host
        .handle_message(r#"{"callbackId":"cb_3","type":42}"#)
        .await
        .unwrap();
    assert_eq!(salvaged.code, ErrorCode::MALFORMED_MESSAGE);
    assert_eq!(salvaged.call_id.as_str(), "cb_3");

    assert!(host.handle_message("not json at all").await.is_none());
    assert!(host.handle_message(r#"{"type":"Bridge.ping"}"#).await.is_none());
    assert_eq!(view.responses().len(), 1);
}

#[tokio::test]
async fn panicking_handler_is_contained() {
    let (host, _view) = ready_host().await;
    host.register_module(PanickingModule::new("Boom", &["go"]))
        .await
        .unwrap();

    let crashed = host
        .handle_message(&test_request_json("Boom.go", "cb_1"))
        .await
        .unwrap();
    assert_eq!(crashed.code, ErrorCode::INTERNAL);
    assert!(crashed.message.contains("panicked"));

    let pong = host
        .handle_message(&test_request_json("Bridge.ping", "cb_2"))
        .await
        .unwrap();
    assert!(pong.is_success());
    assert_eq!(pong.data, json!({"pong": true}));
}

#[tokio::test]
async fn receive_dispatches_on_its_own_task() {
    let (host, view) = ready_host().await;
    let echo = MockModule::new("Echo").with_operation("say");
    host.register_module(echo.clone()).await.unwrap();

    let handle = host.receive(
        r#"{"version":"1.0","type":"Echo.say","params":{"text":"hi"},"callbackId":"cb_5"}"#,
    );
    let response = handle.await.unwrap().unwrap();

    assert_eq!(response.data, json!({"text": "hi"}));
    assert_eq!(echo.call_count(), 1);
    assert_eq!(view.responses(), vec![response]);
}

#[tokio::test]
async fn builtin_module_lists_registrations() {
    let (host, _view) = ready_host().await;
    host.register_module(MockModule::new("Storage").with_operation("get").with_operation("set"))
        .await
        .unwrap();

    let listed = host
        .handle_message(&test_request_json("Bridge.modules", "cb_1"))
        .await
        .unwrap();
    assert_eq!(
        listed.data,
        json!([
            {"name": "Bridge", "operations": ["modules", "ping", "version"]},
            {"name": "Storage", "operations": ["get", "set"]},
        ])
    );

    assert!(host.unregister_module("Storage").await);
    let missing = host
        .handle_message(&test_request_json("Storage.get", "cb_2"))
        .await
        .unwrap();
    assert_eq!(missing.code, ErrorCode::MODULE_NOT_FOUND);
}

#[tokio::test]
async fn hooks_follow_the_lifecycle_and_faults_stay_isolated() {
    let host = BridgeHost::new(HostConfig::default(), Arc::new(InlineExecutor)).unwrap();
    let view = RecordingHostTransport::new();
    host.initialize(Arc::new(view.clone())).await.unwrap();

    let flaky = HookTracer::new("Audio")
        .with_failing_hook(LifecycleHook::Ready)
        .with_panicking_hook(LifecycleHook::Background);
    let steady = HookTracer::new("Location");
    host.register_module(flaky.clone()).await.unwrap();
    host.register_module(steady.clone()).await.unwrap();

    host.mark_ready().await.unwrap();
    host.foreground().await.unwrap();
    host.background().await.unwrap();
    host.foreground().await.unwrap();
    assert_eq!(host.state(), LifecycleState::Active);

    let expected = vec![
        LifecycleHook::Ready,
        LifecycleHook::Foreground,
        LifecycleHook::Background,
        LifecycleHook::Foreground,
    ];
    assert_eq!(flaky.hooks(), expected);
    assert_eq!(steady.hooks(), expected);

    assert!(host.destroy().await);
    assert_eq!(steady.count(LifecycleHook::Teardown), 1);
    assert_eq!(flaky.count(LifecycleHook::Teardown), 1);
    assert_eq!(
        view.event_names(),
        vec![
            "bridge.ready",
            "bridge.foreground",
            "bridge.background",
            "bridge.foreground",
            "bridge.destroyed",
        ]
    );
}

#[tokio::test]
async fn repeated_transitions_do_not_rerun_hooks() {
    let (host, view) = ready_host().await;
    let tracer = HookTracer::new("Sensors");
    host.register_module(tracer.clone()).await.unwrap();

    host.foreground().await.unwrap();
    host.foreground().await.unwrap();
    host.mark_ready().await.unwrap();

    assert_eq!(tracer.hooks(), vec![LifecycleHook::Foreground]);
    assert_eq!(view.event_names(), vec!["bridge.foreground"]);
}

#[tokio::test]
async fn destroyed_host_goes_quiet() {
    let (host, view) = ready_host().await;
    assert!(host.destroy().await);
    assert!(!host.destroy().await);
    assert_eq!(view.event_names(), vec!["bridge.destroyed"]);

    assert!(
        host.handle_message(&test_request_json("Bridge.ping", "cb_1"))
            .await
            .is_none()
    );
    assert!(host.publish_event("late", json!(null)).is_err());
    assert!(host.register_module(MockModule::new("Late")).await.is_err());
    assert_eq!(view.responses().len(), 0);
}

#[tokio::test(start_paused = true)]
async fn stuck_hooks_are_cut_off_without_stalling_the_host() {
    let config = HostConfig::default().with_hook_timeout(Duration::from_millis(200));
    let host = BridgeHost::new(config, Arc::new(InlineExecutor)).unwrap();
    let view = RecordingHostTransport::new();
    host.initialize(Arc::new(view.clone())).await.unwrap();
    host.mark_ready().await.unwrap();

    let stuck = HookTracer::new("Audio")
        .with_stuck_hook(LifecycleHook::Background)
        .with_stuck_hook(LifecycleHook::Teardown);
    host.register_module(stuck.clone()).await.unwrap();

    host.background().await.unwrap();
    assert_eq!(host.state(), LifecycleState::Backgrounded);
    assert_eq!(view.event_names(), vec!["bridge.ready", "bridge.background"]);

    let unregistering = tokio::spawn({
        let host = host.clone();
        async move { host.unregister_module("Audio").await }
    });
    while stuck.count(LifecycleHook::Teardown) == 0 {
        tokio::task::yield_now().await;
    }

    let before = tokio::time::Instant::now();
    let pong = host
        .handle_message(&test_request_json("Bridge.ping", "cb_1"))
        .await
        .unwrap();
    assert!(pong.is_success());
    assert!(before.elapsed() < Duration::from_millis(200));

    assert!(unregistering.await.unwrap());
    assert!(host.destroy().await);
}

/// Counts the registry from its teardown hook.
struct RegistryCounter {
    registry: Weak<tokio::sync::RwLock<ModuleRegistry>>,
    seen: Arc<Mutex<Option<usize>>>,
}

#[async_trait]
impl CapabilityModule for RegistryCounter {
    fn name(&self) -> &str {
        "Counter"
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

    async fn on_teardown(&self) -> ModuleResult<()> {
        if let Some(registry) = self.registry.upgrade() {
            let count = registry.read().await.len();
            *self.seen.lock().unwrap() = Some(count);
        }
        Ok(())
    }
}

#[tokio::test]
async fn teardown_may_read_the_registry() {
    let (host, _view) = ready_host().await;
    let seen = Arc::new(Mutex::new(None));
    let counter = || RegistryCounter {
        registry: Arc::downgrade(&host.registry()),
        seen: Arc::clone(&seen),
    };

    host.register_module(counter()).await.unwrap();
    let removed = tokio::time::timeout(Duration::from_secs(2), host.unregister_module("Counter"));
    assert!(removed.await.unwrap());
    assert_eq!(*seen.lock().unwrap(), Some(1));

    host.register_module(counter()).await.unwrap();
    let destroyed = tokio::time::timeout(Duration::from_secs(2), host.destroy());
    assert!(destroyed.await.unwrap());
    assert_eq!(*seen.lock().unwrap(), Some(0));
}
