//! View executors.
//!
//! Everything that touches the embedded view (delivering a response,
//! publishing an event) is marshalled through a [`ViewExecutor`], the one
//! serialization point between dispatch tasks and the view's owning
//! context.

use tokio::sync::mpsc;
use tracing::{trace, warn};

/// A unit of work to run on the view's context.
pub type ViewTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs closures on the embedded view's owning execution context.
pub trait ViewExecutor: Send + Sync {
    /// Schedule `task`. Tasks run in submission order.
    fn execute(&self, task: ViewTask);
}

/// Runs every task immediately on the calling thread.
///
/// Suitable for embeddings whose view primitive is thread-safe, and for
/// tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl ViewExecutor for InlineExecutor {
    fn execute(&self, task: ViewTask) {
        task();
    }
}

/// Queues tasks for the view owner to drain through a [`ViewQueue`].
#[derive(Debug, Clone)]
pub struct QueuedExecutor {
    sender: mpsc::UnboundedSender<ViewTask>,
}

impl QueuedExecutor {
    /// Create an executor and the queue its tasks land on.
    #[must_use]
    pub fn new() -> (Self, ViewQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, ViewQueue { receiver })
    }
}

impl ViewExecutor for QueuedExecutor {
    fn execute(&self, task: ViewTask) {
        if self.sender.send(task).is_err() {
            warn!("View queue closed, dropping task");
        }
    }
}

/// The receiving end of a [`QueuedExecutor`], owned by the view's context.
pub struct ViewQueue {
    receiver: mpsc::UnboundedReceiver<ViewTask>,
}

impl ViewQueue {
    /// Run every task queued so far. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran: usize = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran = ran.saturating_add(1);
        }
        if ran > 0 {
            trace!(ran, "Drained view queue");
        }
        ran
    }

    /// Run tasks as they arrive until every executor handle is dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.receiver.recv().await {
            task();
        }
    }
}

impl std::fmt::Debug for ViewQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewQueue").finish_non_exhaustive()
    }
}
