//! End-to-end: a real client and host talking over in-memory transports.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use serde_json::{Value, json};
use tether_client::ClientConfig;
use tether_core::{ErrorCode, LifecycleState, Params};
use tether_host::{HostConfig, LifecycleHook, ModuleError};
use tether_test::{
    HookTracer, Loopback, MockModule, PanickingModule, init_test_logging, test_params,
};

#[tokio::test]
async fn bridge_comes_up_ready_on_both_sides() {
    init_test_logging();
    let bridge = Loopback::start().await;
    assert_eq!(bridge.host.state(), LifecycleState::Ready);
    assert_eq!(bridge.client.state(), LifecycleState::Ready);
    assert_eq!(bridge.view.event_names(), vec!["bridge.ready"]);
}

#[tokio::test]
async fn round_trip_returns_handler_data() {
    let bridge = Loopback::start().await;
    let storage = MockModule::new("Storage").with_reply("get", json!({"value": "42"}));
    bridge.host.register_module(storage.clone()).await.unwrap();

    let value = bridge
        .client
        .call("Storage.get", test_params(json!({"key": "answer"})))
        .await
        .unwrap();

    assert_eq!(value, json!({"value": "42"}));
    let calls = storage.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "get");
    assert_eq!(calls[0].1.get("key"), Some(&json!("answer")));
}

#[tokio::test]
async fn builtin_bridge_module_answers() {
    let bridge = Loopback::start().await;
    let pong = bridge.client.call("Bridge.ping", Params::new()).await.unwrap();
    assert_eq!(pong, json!({"pong": true}));
    let version = bridge.client.call("Bridge.version", Params::new()).await.unwrap();
    assert_eq!(version, json!({"version": "1.0"}));
}

#[tokio::test]
async fn errors_cross_the_bridge_verbatim() {
    let bridge = Loopback::start().await;
    bridge
        .host
        .register_module(
            MockModule::new("Camera")
                .with_error("capture", ModuleError::permission_denied("camera access denied")),
        )
        .await
        .unwrap();

    let denied = bridge
        .client
        .call("Camera.capture", Params::new())
        .await
        .unwrap_err();
    assert_eq!(denied.code(), ErrorCode::PERMISSION_DENIED);
    assert_eq!(denied.message(), "camera access denied");

    let missing = bridge
        .client
        .call("Camera.record", Params::new())
        .await
        .unwrap_err();
    assert_eq!(missing.code(), ErrorCode::METHOD_NOT_FOUND);

    let unknown = bridge.client.call("Nfc.scan", Params::new()).await.unwrap_err();
    assert_eq!(unknown.code(), ErrorCode::MODULE_NOT_FOUND);
}

#[tokio::test]
async fn version_mismatch_is_reported_to_the_caller() {
    let bridge = Loopback::start_with(
        ClientConfig::default().with_protocol_version("2.0"),
        HostConfig::default(),
    )
    .await;
    let err = bridge
        .client
        .call("Bridge.ping", Params::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VERSION_MISMATCH);
}

#[tokio::test(start_paused = true)]
async fn slower_calls_settle_after_faster_ones() {
    let bridge = Loopback::start().await;
    bridge
        .host
        .register_module(
            MockModule::new("Work")
                .with_reply("slow", json!("slow"))
                .with_delay("slow", Duration::from_millis(300))
                .with_reply("fast", json!("fast"))
                .with_delay("fast", Duration::from_millis(10)),
        )
        .await
        .unwrap();

    let slow = bridge.client.call("Work.slow", Params::new());
    let fast = bridge.client.call("Work.fast", Params::new());
    let results = join_all([slow, fast]).await;
    assert_eq!(results[0].as_ref().unwrap(), &json!("slow"));
    assert_eq!(results[1].as_ref().unwrap(), &json!("fast"));

    let order: Vec<Value> = bridge
        .view
        .responses()
        .into_iter()
        .map(|r| r.data)
        .collect();
    assert_eq!(order, vec![json!("fast"), json!("slow")]);
}

#[tokio::test(start_paused = true)]
async fn timed_out_call_ignores_the_late_answer() {
    let bridge = Loopback::start().await;
    bridge
        .host
        .register_module(MockModule::new("Slow").with_delay("op", Duration::from_secs(10)))
        .await
        .unwrap();

    let err = bridge
        .client
        .call_with_timeout("Slow.op", Params::new(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TIMEOUT);

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(bridge.view.responses().len(), 1);
    assert_eq!(bridge.client.pending_count(), 0);
}

#[tokio::test]
async fn handler_panic_does_not_take_the_bridge_down() {
    let bridge = Loopback::start().await;
    bridge
        .host
        .register_module(PanickingModule::new("Boom", &["go"]))
        .await
        .unwrap();

    let err = bridge.client.call("Boom.go", Params::new()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::INTERNAL);

    let pong = bridge.client.call("Bridge.ping", Params::new()).await;
    assert!(pong.is_ok());
}

#[tokio::test]
async fn host_events_reach_content_listeners() {
    let bridge = Loopback::start().await;
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let subscription = bridge.client.subscribe("battery.low", move |event| {
        assert_eq!(event.data, json!({"level": 5}));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bridge.host.publish_event("battery.low", json!({"level": 5})).unwrap();
    bridge.host.publish_event("network.up", Value::Null).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    assert!(subscription.unsubscribe());
    bridge.host.publish_event("battery.low", json!({"level": 5})).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_listener_does_not_starve_others() {
    let bridge = Loopback::start().await;
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    let _bad = bridge
        .client
        .subscribe("tick", |_event| panic!("listener fault"));
    let _good = bridge.client.subscribe("tick", move |_event| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bridge.host.publish_event("tick", Value::Null).unwrap();
    bridge.host.publish_event("tick", Value::Null).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn lifecycle_follows_the_host() {
    let bridge = Loopback::start().await;
    let tracer = HookTracer::new("Media");
    bridge.host.register_module(tracer.clone()).await.unwrap();

    bridge.host.foreground().await.unwrap();
    assert_eq!(bridge.client.state(), LifecycleState::Active);

    bridge.host.background().await.unwrap();
    assert_eq!(bridge.client.state(), LifecycleState::Backgrounded);
    let hooks = bridge.client.call("Media.hooks", Params::new()).await.unwrap();
    assert_eq!(hooks, json!(["on_foreground", "on_background"]));

    assert_eq!(
        tracer.hooks(),
        vec![LifecycleHook::Foreground, LifecycleHook::Background]
    );
}

#[tokio::test(start_paused = true)]
async fn host_destroy_cancels_pending_content_calls() {
    let bridge = Loopback::start().await;
    bridge
        .host
        .register_module(MockModule::new("Slow").with_delay("op", Duration::from_secs(60)))
        .await
        .unwrap();

    let pending = bridge.client.call("Slow.op", Params::new());
    tokio::task::yield_now().await;

    assert!(bridge.host.destroy().await);
    assert_eq!(bridge.client.state(), LifecycleState::Destroyed);

    let err = pending.await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CANCELLED);

    let err = bridge.client.call("Bridge.ping", Params::new()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::DESTROYED);
    assert!(!bridge.host.destroy().await);
}
