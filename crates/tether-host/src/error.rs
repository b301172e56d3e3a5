//! Host-side error types.

use serde_json::Value;
use tether_core::{ErrorCode, LifecycleError, ProtocolError, TransportError};
use thiserror::Error;

/// A typed failure reported by a capability module.
///
/// The code and message reach the caller verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {message}")]
pub struct ModuleError {
    /// Status code; should be non-zero.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Optional payload attached to the error response.
    pub data: Value,
}

impl ModuleError {
    /// Build an error with `code` and `message`.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
        }
    }

    /// The user or platform denied access (3001).
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PERMISSION_DENIED, message)
    }

    /// The device or system forbids the operation (4001).
    #[must_use]
    pub fn device_restricted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DEVICE_RESTRICTED, message)
    }

    /// An unexpected fault inside the module (5000).
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INTERNAL, message)
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Result of a module operation or hook.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Host setup and delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A global receiver name is not a valid script identifier.
    #[error("invalid receiver name '{0}'")]
    InvalidReceiver(String),

    /// The host has been destroyed.
    #[error("bridge host destroyed")]
    Destroyed,

    /// A lifecycle transition was rejected.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The outbound transport failed or is detached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result of a host operation.
pub type HostResult<T> = Result<T, HostError>;
