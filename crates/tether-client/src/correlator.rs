//! Callback correlator.
//!
//! Issues call identifiers, tracks in-flight calls with their deadlines and
//! settles each one exactly once: on response, on deadline expiry, or on
//! cancellation, whichever comes first. Whoever removes the entry from the
//! pending map owns the right to settle it; everyone else finds nothing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use serde_json::Value;
use tether_core::{BridgeError, BridgeResult, CallId, Response};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

/// Default call identifier prefix.
pub const DEFAULT_CALL_ID_PREFIX: &str = "cb_";

/// An in-flight call awaiting its response.
struct PendingCall {
    capability: String,
    sender: oneshot::Sender<BridgeResult<Value>>,
    deadline: AbortHandle,
    issued_at: Instant,
}

impl PendingCall {
    fn settle(self, outcome: BridgeResult<Value>) {
        self.deadline.abort();
        // The caller may have dropped its future; nothing to deliver then.
        let _ = self.sender.send(outcome);
    }
}

#[derive(Default)]
struct Inner {
    pending: HashMap<CallId, PendingCall>,
    next_id: u64,
}

/// Tracks pending calls by [`CallId`].
///
/// Cloning a `Correlator` creates a new handle to the same pending set.
#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Mutex<Inner>>,
    prefix: Arc<str>,
}

impl Correlator {
    /// Create a correlator whose identifiers look like `{prefix}{n}`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            prefix: Arc::from(prefix),
        }
    }

    fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
        inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new pending call and arm its deadline.
    ///
    /// The identifier is fresh among all currently outstanding calls.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NoRuntime`] outside a Tokio runtime, since the
    /// deadline could never fire; nothing is recorded then.
    pub fn register(
        &self,
        capability: &str,
        timeout: Duration,
    ) -> BridgeResult<(CallId, CallFuture)> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(capability, "No Tokio runtime; refusing a call without a deadline");
            return Err(BridgeError::NoRuntime);
        };
        let (sender, receiver) = oneshot::channel();
        let mut inner = Self::lock(&self.inner);

        let call_id = loop {
            inner.next_id = inner.next_id.wrapping_add(1);
            let candidate = CallId::new(format!("{}{}", self.prefix, inner.next_id));
            if !inner.pending.contains_key(&candidate) {
                break candidate;
            }
        };

        let weak = Arc::downgrade(&self.inner);
        let id = call_id.clone();
        let deadline = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            expire(&weak, &id, timeout);
        });

        inner.pending.insert(
            call_id.clone(),
            PendingCall {
                capability: capability.to_owned(),
                sender,
                deadline: deadline.abort_handle(),
                issued_at: Instant::now(),
            },
        );
        debug!(call_id = %call_id, capability, timeout_ms = millis(timeout), "Call registered");

        let future = CallFuture::pending(call_id.clone(), receiver);
        Ok((call_id, future))
    }

    /// Settle the call a response belongs to.
    ///
    /// Returns `false` when no call is pending under the response's id (it
    /// already timed out, was cancelled, or the response is a duplicate);
    /// such responses are dropped.
    pub fn resolve(&self, response: Response) -> bool {
        let Some(call) = Self::lock(&self.inner).pending.remove(&response.call_id) else {
            trace!(call_id = %response.call_id, code = %response.code, "Dropping stale response");
            return false;
        };
        debug!(
            call_id = %response.call_id,
            capability = %call.capability,
            code = %response.code,
            elapsed_ms = millis(call.issued_at.elapsed()),
            "Call settled"
        );
        call.settle(response.into_result());
        true
    }

    /// Settle a pending call with `error`. Returns `false` if it was not
    /// pending.
    pub fn fail(&self, call_id: &CallId, error: BridgeError) -> bool {
        let Some(call) = Self::lock(&self.inner).pending.remove(call_id) else {
            return false;
        };
        debug!(call_id = %call_id, capability = %call.capability, error = %error, "Call failed");
        call.settle(Err(error));
        true
    }

    /// Reject every pending call as cancelled with `reason`.
    ///
    /// Returns the number of calls cancelled. All deadline tasks are aborted.
    pub fn cancel_all(&self, reason: &str) -> usize {
        let drained: Vec<(CallId, PendingCall)> =
            Self::lock(&self.inner).pending.drain().collect();
        let count = drained.len();
        for (call_id, call) in drained {
            trace!(call_id = %call_id, capability = %call.capability, "Cancelling call");
            call.settle(Err(BridgeError::cancelled(reason)));
        }
        if count > 0 {
            debug!(count, reason, "Pending calls cancelled");
        }
        count
    }

    /// Number of calls awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        Self::lock(&self.inner).pending.len()
    }

    /// Whether `call_id` is awaiting a response.
    #[must_use]
    pub fn is_pending(&self, call_id: &CallId) -> bool {
        Self::lock(&self.inner).pending.contains_key(call_id)
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_ID_PREFIX)
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("prefix", &self.prefix)
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn expire(inner: &Weak<Mutex<Inner>>, call_id: &CallId, timeout: Duration) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let Some(call) = Correlator::lock(&inner).pending.remove(call_id) else {
        return;
    };
    debug!(call_id = %call_id, capability = %call.capability, "Call timed out");
    // The deadline task is the one running; don't abort it from within.
    let _ = call.sender.send(Err(BridgeError::Timeout {
        call_id: call_id.clone(),
        timeout_ms: millis(timeout),
    }));
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// The eventual outcome of a bridge call.
///
/// The request has already been sent when this future is handed out; the
/// caller only suspends when awaiting it.
#[derive(Debug)]
#[must_use = "a call's outcome is only observed by awaiting its future"]
pub struct CallFuture {
    call_id: Option<CallId>,
    state: CallState,
}

#[derive(Debug)]
enum CallState {
    Waiting(oneshot::Receiver<BridgeResult<Value>>),
    Settled(Option<BridgeResult<Value>>),
}

impl CallFuture {
    fn pending(call_id: CallId, receiver: oneshot::Receiver<BridgeResult<Value>>) -> Self {
        Self {
            call_id: Some(call_id),
            state: CallState::Waiting(receiver),
        }
    }

    /// A call rejected before it was issued.
    pub(crate) fn rejected(error: BridgeError) -> Self {
        Self {
            call_id: None,
            state: CallState::Settled(Some(Err(error))),
        }
    }

    /// The call's identifier; `None` if it was rejected before issuance.
    #[must_use]
    pub fn call_id(&self) -> Option<&CallId> {
        self.call_id.as_ref()
    }
}

impl Future for CallFuture {
    type Output = BridgeResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            CallState::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(_)) => {
                    Poll::Ready(Err(BridgeError::cancelled("correlator dropped")))
                },
                Poll::Pending => Poll::Pending,
            },
            CallState::Settled(outcome) => Poll::Ready(
                outcome
                    .take()
                    .unwrap_or_else(|| Err(BridgeError::cancelled("outcome already taken"))),
            ),
        }
    }
}
