//! Wire message shapes.
//!
//! Field names on the wire follow the JSON schema shared with the content
//! side (`type`, `callbackId`, `msg`, `event`); the Rust field names follow
//! the data model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::code::ErrorCode;
use crate::error::{BridgeError, ProtocolError};

/// Protocol version spoken when nothing else is configured.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.0";

/// Request parameters: a JSON object.
pub type Params = serde_json::Map<String, Value>;

/// Token correlating a request with its eventual response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Wrap a call identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CallId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A parsed `Module.Method` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Capability {
    module: String,
    method: String,
}

impl Capability {
    /// Build a capability from its two halves.
    #[must_use]
    pub fn new(module: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            method: method.into(),
        }
    }

    /// Parse `Module.Method`, splitting at the first `.`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCapability`] if there is no separator
    /// or either half is empty.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        match raw.split_once('.') {
            Some((module, method)) if !module.is_empty() && !method.is_empty() => {
                Ok(Self::new(module, method))
            },
            _ => Err(ProtocolError::InvalidCapability(raw.to_owned())),
        }
    }

    /// The module half.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The method (operation) half.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.method)
    }
}

impl FromStr for Capability {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Content → host call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version the content side speaks.
    pub version: String,
    /// `Module.Method` capability address, unparsed.
    #[serde(rename = "type")]
    pub capability: String,
    /// Call parameters. Absent or `null` decodes as an empty object.
    #[serde(default, deserialize_with = "params_or_empty")]
    pub params: Params,
    /// Correlation token.
    #[serde(rename = "callbackId")]
    pub call_id: CallId,
}

impl Request {
    /// Build a request.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        capability: &Capability,
        params: Params,
        call_id: CallId,
    ) -> Self {
        Self {
            version: version.into(),
            capability: capability.to_string(),
            params,
            call_id,
        }
    }

    /// Parse the capability address.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCapability`] if the address is not of
    /// the form `Module.Method`.
    pub fn parsed_capability(&self) -> Result<Capability, ProtocolError> {
        Capability::parse(&self.capability)
    }
}

fn params_or_empty<'de, D>(deserializer: D) -> Result<Params, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Params>::deserialize(deserializer)?.unwrap_or_default())
}

/// Host → content answer to exactly one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation token copied from the request.
    #[serde(rename = "callbackId")]
    pub call_id: CallId,
    /// Status code; `0` is success.
    pub code: ErrorCode,
    /// Human-readable message.
    #[serde(rename = "msg", default)]
    pub message: String,
    /// Result payload, `null` when there is none.
    #[serde(default)]
    pub data: Value,
}

impl Response {
    /// A successful response carrying `data`.
    #[must_use]
    pub fn success(call_id: CallId, data: Value) -> Self {
        Self {
            call_id,
            code: ErrorCode::SUCCESS,
            message: "success".to_owned(),
            data,
        }
    }

    /// An error response.
    #[must_use]
    pub fn error(call_id: CallId, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            call_id,
            code,
            message: message.into(),
            data: Value::Null,
        }
    }

    /// Attach a payload to the response.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Whether the status code signals success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Convert into the caller-facing outcome: the payload on success, a
    /// [`BridgeError::Remote`] carrying the exact code and message otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Remote`] for any non-zero status code.
    pub fn into_result(self) -> Result<Value, BridgeError> {
        if self.code.is_success() {
            Ok(self.data)
        } else {
            Err(BridgeError::Remote {
                code: self.code,
                message: self.message,
                data: self.data,
            })
        }
    }
}

/// Host-originated notification, unrelated to any call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name.
    #[serde(rename = "event")]
    pub name: String,
    /// Event payload, `null` when there is none.
    #[serde(default)]
    pub data: Value,
}

impl Event {
    /// Build an event.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}
