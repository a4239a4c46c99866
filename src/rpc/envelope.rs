//! JSON-RPC 2.0 request and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ClientError;

/// Protocol version marker carried by every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request. Parameters are positional only.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(id: u64, method: &str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// A decoded response envelope before error normalization.
///
/// Both channels are kept as received: the server may fill `result` with a
/// status descriptor and `error` with something unrelated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RawResponse {
    /// Decodes a response body and checks it answers `request`.
    pub fn decode(body: Value, request: &Request) -> Result<Self, ClientError> {
        if !body.is_object() {
            return Err(ClientError::Protocol(format!(
                "response to '{}' is not a JSON-RPC envelope: {}",
                request.method, body
            )));
        }
        let response: RawResponse = serde_json::from_value(body)
            .map_err(|e| ClientError::Protocol(e.to_string()))?;

        let echoed = match &response.id {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        if echoed != Some(request.id) {
            return Err(ClientError::Protocol(format!(
                "response id {} does not match request id {} ('{}')",
                response.id, request.id, request.method
            )));
        }

        Ok(response)
    }

    /// Returns the error channel if it carries anything.
    pub fn error(&self) -> Option<&Value> {
        self.error.as_ref().filter(|e| !e.is_null())
    }
}

/// Monotonic request id source, one per transport.
#[derive(Debug, Default)]
pub struct RequestIds {
    last: u64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}
