//! Loopback harness wiring a real client to a real host.

use std::sync::{Arc, Weak};

use tether_client::{BridgeClient, ChannelTransport, ClientConfig};
use tether_core::TransportError;
use tether_core::script::parse_injection_script;
use tether_host::{BridgeHost, HostConfig, HostTransport, InlineExecutor};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::mocks::RecordingHostTransport;

/// Install a test-friendly subscriber once. Honors `RUST_LOG`, defaulting
/// to `warn`.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// The host's view of the content: records each script, then routes it to
/// the client's response or event entry point.
struct ContentView {
    client: Weak<BridgeClient>,
    response_receiver: String,
    event_receiver: String,
    recorder: RecordingHostTransport,
}

impl HostTransport for ContentView {
    fn evaluate_script(&self, script: &str) -> Result<(), TransportError> {
        self.recorder.evaluate_script(script)?;
        let client = self.client.upgrade().ok_or(TransportError::Detached)?;
        let (receiver, json) = parse_injection_script(script)
            .ok_or_else(|| TransportError::Send(format!("unparsable script: {script}")))?;
        if receiver == self.response_receiver {
            client.handle_response(&json);
        } else if receiver == self.event_receiver {
            client.handle_event(&json);
        } else {
            return Err(TransportError::Send(format!("unknown receiver {receiver}")));
        }
        Ok(())
    }
}

/// A client and host talking over in-memory transports.
///
/// Requests travel through a [`ChannelTransport`] pumped into
/// [`BridgeHost::receive`]; responses and events are injected scripts
/// delivered synchronously to the client.
pub struct Loopback {
    /// Content side.
    pub client: Arc<BridgeClient>,
    /// Host side.
    pub host: BridgeHost,
    /// Every script the host injected.
    pub view: RecordingHostTransport,
    pump: JoinHandle<()>,
}

impl Loopback {
    /// Start with default settings on both sides. Both end up ready.
    ///
    /// # Panics
    ///
    /// Panics if the bridge fails to come up.
    pub async fn start() -> Self {
        Self::start_with(ClientConfig::default(), HostConfig::default()).await
    }

    /// Start with explicit settings. Both end up ready.
    ///
    /// # Panics
    ///
    /// Panics if the bridge fails to come up.
    pub async fn start_with(client_config: ClientConfig, host_config: HostConfig) -> Self {
        let client = Arc::new(BridgeClient::new(client_config));
        let (transport, mut inbound) = ChannelTransport::new();
        client
            .attach_transport(Arc::new(transport))
            .expect("client transport attaches");

        let view = RecordingHostTransport::new();
        let content = ContentView {
            client: Arc::downgrade(&client),
            response_receiver: host_config.response_receiver.clone(),
            event_receiver: host_config.event_receiver.clone(),
            recorder: view.clone(),
        };
        let host = BridgeHost::new(host_config, Arc::new(InlineExecutor))
            .expect("host config is valid");
        host.initialize(Arc::new(content))
            .await
            .expect("host initializes");

        let pump_host = host.clone();
        let pump = tokio::spawn(async move {
            while let Some(raw) = inbound.recv().await {
                drop(pump_host.receive(raw));
            }
        });

        host.mark_ready().await.expect("host becomes ready");

        Self {
            client,
            host,
            view,
            pump,
        }
    }
}

impl Drop for Loopback {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
