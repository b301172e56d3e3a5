//! Error types shared by both sides of the bridge.

use serde_json::Value;
use thiserror::Error;

use crate::code::{ErrorClass, ErrorCode};
use crate::lifecycle::LifecycleState;
use crate::protocol::CallId;

/// Structural or version problems with a wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The message failed structural validation.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The request speaks a different protocol version.
    #[error("protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The negotiated version.
        expected: String,
        /// The version carried by the request.
        actual: String,
    },

    /// The capability address is not `Module.Method`.
    #[error("invalid capability '{0}': expected Module.Method")]
    InvalidCapability(String),

    /// A message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// The wire code reported for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(_) | Self::Encode(_) => ErrorCode::MALFORMED_MESSAGE,
            Self::VersionMismatch { .. } => ErrorCode::VERSION_MISMATCH,
            Self::InvalidCapability(_) => ErrorCode::INVALID_CAPABILITY,
        }
    }
}

/// Failures of the underlying one-way injection primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport has been detached.
    #[error("transport detached")]
    Detached,

    /// The embedding rejected the message.
    #[error("transport send failed: {0}")]
    Send(String),
}

/// Rejected lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The state machine has no edge between the two states.
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        /// State the bridge was in.
        from: LifecycleState,
        /// Requested state.
        to: LifecycleState,
    },
}

/// The error a caller's pending call rejects with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// The host answered with a non-zero status code.
    #[error("[{code}] {message}")]
    Remote {
        /// Exact status code from the response.
        code: ErrorCode,
        /// Exact message from the response.
        message: String,
        /// Payload attached to the error response.
        data: Value,
    },

    /// No response arrived before the deadline.
    #[error("call {call_id} timed out after {timeout_ms}ms")]
    Timeout {
        /// The call that expired.
        call_id: CallId,
        /// Deadline that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The bridge has not reached the ready state.
    #[error("bridge is not ready (state: {state})")]
    NotReady {
        /// State at the time of the call.
        state: LifecycleState,
    },

    /// No transport is attached.
    #[error("bridge call not supported: no transport attached")]
    NotSupported,

    /// The call was cancelled before a response arrived.
    #[error("call cancelled: {reason}")]
    Cancelled {
        /// Why the pending call was cancelled.
        reason: String,
    },

    /// The bridge has been destroyed.
    #[error("bridge destroyed")]
    Destroyed,

    /// No async runtime is available to arm the call's deadline.
    #[error("no async runtime to arm the call deadline")]
    NoRuntime,

    /// The transport refused the outbound request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl BridgeError {
    /// Build a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// The status code this error carries.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Remote { code, .. } => *code,
            Self::Timeout { .. } => ErrorCode::TIMEOUT,
            Self::NotReady { .. } => ErrorCode::NOT_READY,
            Self::NotSupported => ErrorCode::NOT_SUPPORTED,
            Self::Cancelled { .. } => ErrorCode::CANCELLED,
            Self::Destroyed => ErrorCode::DESTROYED,
            Self::NoRuntime => ErrorCode::INTERNAL,
            Self::Transport(_) => ErrorCode::TRANSPORT_FAILURE,
            Self::Protocol(e) => e.code(),
        }
    }

    /// The human-readable message. For host-reported errors this is the
    /// response's `msg` verbatim.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// The class of [`Self::code`].
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        self.code().class()
    }
}

/// Result of a bridge call.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_errors_are_internal_class() {
        let errors = [
            BridgeError::Timeout {
                call_id: CallId::new("cb_1"),
                timeout_ms: 10,
            },
            BridgeError::NotReady {
                state: LifecycleState::Initializing,
            },
            BridgeError::NotSupported,
            BridgeError::cancelled("reload"),
            BridgeError::Destroyed,
            BridgeError::NoRuntime,
            BridgeError::Transport(TransportError::Detached),
        ];
        for err in errors {
            assert_eq!(err.class(), ErrorClass::Internal, "{err}");
        }
    }

    #[test]
    fn not_ready_reports_5003() {
        let err = BridgeError::NotReady {
            state: LifecycleState::Uninitialized,
        };
        assert_eq!(err.code().as_i32(), 5003);
        assert_eq!(err.to_string(), "bridge is not ready (state: uninitialized)");
    }

    #[test]
    fn protocol_codes() {
        assert_eq!(
            ProtocolError::Malformed("x".into()).code(),
            ErrorCode::MALFORMED_MESSAGE
        );
        assert_eq!(
            ProtocolError::VersionMismatch {
                expected: "1.0".into(),
                actual: "2.0".into()
            }
            .code(),
            ErrorCode::VERSION_MISMATCH
        );
        assert_eq!(
            BridgeError::from(ProtocolError::InvalidCapability("x".into())).code(),
            ErrorCode::INVALID_CAPABILITY
        );
    }

    #[test]
    fn remote_display_includes_code() {
        let err = BridgeError::Remote {
            code: ErrorCode::PERMISSION_DENIED,
            message: "denied".into(),
            data: Value::Null,
        };
        assert_eq!(err.to_string(), "[3001] denied");
        assert_eq!(err.message(), "denied");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BridgeError>();
    }
}
