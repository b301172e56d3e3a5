//! Wire status codes and their classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A wire status code. `0` is success; everything else is an error whose
/// class is determined by its numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(i32);

impl ErrorCode {
    /// The call succeeded.
    pub const SUCCESS: Self = Self(0);

    /// The request carried a protocol version other than the negotiated one.
    pub const VERSION_MISMATCH: Self = Self(1001);
    /// The message failed structural validation.
    pub const MALFORMED_MESSAGE: Self = Self(1002);
    /// The capability string is not of the form `Module.Method`.
    pub const INVALID_CAPABILITY: Self = Self(1003);

    /// No module is registered under the requested name.
    pub const MODULE_NOT_FOUND: Self = Self(2001);
    /// The module does not support the requested operation.
    pub const METHOD_NOT_FOUND: Self = Self(2002);

    /// The host denied the permission required by the operation.
    pub const PERMISSION_DENIED: Self = Self(3001);

    /// The device or operating system restricts the operation.
    pub const DEVICE_RESTRICTED: Self = Self(4001);

    /// A handler faulted while processing the request.
    pub const INTERNAL: Self = Self(5000);
    /// The call did not complete before its deadline (client only).
    pub const TIMEOUT: Self = Self(5001);
    /// The call was cancelled before a response arrived.
    pub const CANCELLED: Self = Self(5002);
    /// The bridge has not reached the ready state.
    pub const NOT_READY: Self = Self(5003);
    /// The bridge has been destroyed.
    pub const DESTROYED: Self = Self(5004);
    /// No transport is attached, so calls cannot be delivered.
    pub const NOT_SUPPORTED: Self = Self(5005);
    /// The transport rejected an outbound message (client only).
    pub const TRANSPORT_FAILURE: Self = Self(5006);

    /// Wrap a raw numeric code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Whether this code signals success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Classify the code by its numeric range.
    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self.0 {
            0 => ErrorClass::Success,
            1000..=1999 => ErrorClass::Protocol,
            2000..=2999 => ErrorClass::Capability,
            3000..=3999 => ErrorClass::Permission,
            4000..=4999 => ErrorClass::Device,
            5000..=5999 => ErrorClass::Internal,
            _ => ErrorClass::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.0
    }
}

/// Error classes, one per reserved code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Code `0`.
    Success,
    /// 1000–1999: bad version, malformed payload.
    Protocol,
    /// 2000–2999: module or method missing.
    Capability,
    /// 3000–3999: permission refused by the host.
    Permission,
    /// 4000–4999: device or system restriction.
    Device,
    /// 5000–5999: handler faults, timeout, not ready, destroyed, cancelled.
    Internal,
    /// Outside every reserved range.
    Unknown,
}

impl ErrorClass {
    /// Short lowercase name, suitable for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Protocol => "protocol",
            Self::Capability => "capability",
            Self::Permission => "permission",
            Self::Device => "device",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        }
    }

    /// Protocol and capability errors are deterministic: retrying the same
    /// request yields the same answer.
    #[must_use]
    pub const fn is_deterministic(self) -> bool {
        matches!(self, Self::Protocol | Self::Capability)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
