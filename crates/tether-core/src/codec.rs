//! Protocol codec.
//!
//! Every decoder first parses the input into a JSON value and requires a
//! top-level object, then deserializes the typed shape and applies the
//! checks serde cannot express (non-empty identifiers). All failures are
//! reported as [`ProtocolError`] so they never travel further than the
//! dispatch boundary.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::protocol::{CallId, Event, Request, Response};

/// Encode a request for the content → host direction.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    encode(request)
}

/// Encode a response for the host → content direction.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    encode(response)
}

/// Encode an event for the host → content direction.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_event(event: &Event) -> Result<String, ProtocolError> {
    encode(event)
}

/// Decode and validate a request.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] on a missing field, a wrong field
/// type, or an empty `callbackId`.
pub fn decode_request(raw: &str) -> Result<Request, ProtocolError> {
    let request: Request = decode(raw)?;
    if request.call_id.as_str().is_empty() {
        return Err(ProtocolError::Malformed("callbackId must not be empty".into()));
    }
    Ok(request)
}

/// Decode and validate a response.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] on a missing field, a wrong field
/// type, or an empty `callbackId`.
pub fn decode_response(raw: &str) -> Result<Response, ProtocolError> {
    let response: Response = decode(raw)?;
    if response.call_id.as_str().is_empty() {
        return Err(ProtocolError::Malformed("callbackId must not be empty".into()));
    }
    Ok(response)
}

/// Decode and validate an event.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] on a missing field, a wrong field
/// type, or an empty event name.
pub fn decode_event(raw: &str) -> Result<Event, ProtocolError> {
    let event: Event = decode(raw)?;
    if event.name.is_empty() {
        return Err(ProtocolError::Malformed("event name must not be empty".into()));
    }
    Ok(event)
}

/// Best-effort recovery of the `callbackId` from a message that failed
/// validation, so the rejection can still be correlated by the caller.
#[must_use]
pub fn salvage_call_id(raw: &str) -> Option<CallId> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let id = value.get("callbackId")?.as_str()?;
    (!id.is_empty()).then(|| CallId::new(id))
}

fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|e| ProtocolError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, ProtocolError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ProtocolError::Malformed(
            "message must be a JSON object".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
