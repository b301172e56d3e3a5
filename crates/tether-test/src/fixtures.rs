//! Test fixtures for wire messages.

use serde_json::{Value, json};

use tether_core::{CallId, DEFAULT_PROTOCOL_VERSION, Params, Request, Response};

/// Call id `cb_{n}`, matching the client's default numbering.
#[must_use]
pub fn test_call_id(n: u64) -> CallId {
    CallId::new(format!("cb_{n}"))
}

/// Params from a JSON object. Anything else yields empty params.
#[must_use]
pub fn test_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// A request for `capability` with empty params. The capability is not
/// validated, so malformed addresses can be built too.
#[must_use]
pub fn test_request(capability: &str, call_id: &str) -> Request {
    Request {
        version: DEFAULT_PROTOCOL_VERSION.to_owned(),
        capability: capability.to_owned(),
        params: Params::new(),
        call_id: CallId::new(call_id),
    }
}

/// Wire form of [`test_request`].
#[must_use]
pub fn test_request_json(capability: &str, call_id: &str) -> String {
    test_request_json_versioned(DEFAULT_PROTOCOL_VERSION, capability, call_id)
}

/// Wire form of a request speaking `version`.
#[must_use]
pub fn test_request_json_versioned(version: &str, capability: &str, call_id: &str) -> String {
    json!({
        "version": version,
        "type": capability,
        "params": {},
        "callbackId": call_id,
    })
    .to_string()
}

/// A success response for `call_id`.
#[must_use]
pub fn test_response(call_id: &str, data: Value) -> Response {
    Response::success(CallId::new(call_id), data)
}
