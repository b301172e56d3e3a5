//! Content → host transport.

use tether_core::TransportError;
use tokio::sync::mpsc;

/// The one-way primitive the content side posts raw request strings
/// through.
pub trait ContentTransport: Send + Sync {
    /// Post one encoded request to the host.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the embedding refuses the message.
    fn post_message(&self, message: &str) -> Result<(), TransportError>;
}

/// A transport that forwards every message into an unbounded channel.
///
/// The receiving half is typically pumped into the host's inbound entry
/// point.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its messages arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ContentTransport for ChannelTransport {
    fn post_message(&self, message: &str) -> Result<(), TransportError> {
        self.sender
            .send(message.to_owned())
            .map_err(|_| TransportError::Detached)
    }
}
