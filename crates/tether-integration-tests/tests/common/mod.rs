//! Shared helpers for integration tests.

use std::sync::Arc;

use tether_client::{BridgeClient, ClientConfig};
use tether_host::{BridgeHost, HostConfig, InlineExecutor};
use tether_test::{RecordingContentTransport, RecordingHostTransport, init_test_logging};

/// A ready host whose injected scripts are recorded.
#[allow(dead_code)]
pub async fn ready_host() -> (BridgeHost, RecordingHostTransport) {
    init_test_logging();
    let host = BridgeHost::new(HostConfig::default(), Arc::new(InlineExecutor))
        .expect("default host config is valid");
    let view = RecordingHostTransport::new();
    host.initialize(Arc::new(view.clone()))
        .await
        .expect("host initializes");
    host.mark_ready().await.expect("host becomes ready");
    view.clear();
    (host, view)
}

/// A ready client whose posted requests are recorded.
#[allow(dead_code)]
pub fn ready_client() -> (BridgeClient, RecordingContentTransport) {
    init_test_logging();
    let client = BridgeClient::new(ClientConfig::default());
    let outbox = RecordingContentTransport::new();
    client
        .attach_transport(Arc::new(outbox.clone()))
        .expect("transport attaches");
    client.mark_ready().expect("client becomes ready");
    (client, outbox)
}
