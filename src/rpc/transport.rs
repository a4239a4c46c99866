//! HTTP transport for JSON-RPC calls.
//!
//! [`Transport`] owns the request id counter, builds envelopes and checks
//! that each response answers the request that was sent. The actual I/O
//! goes through an [`Endpoint`], which is a blocking HTTP client in
//! production and a scripted replay in tests.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use super::envelope::{RawResponse, Request, RequestIds};
use super::error::ClientError;

/// Something that accepts a JSON request body and returns a JSON body.
pub trait Endpoint {
    /// Posts `body` and returns the decoded response body.
    fn post(&mut self, body: &Value) -> Result<Value, ClientError>;

    /// Releases the underlying connection resources.
    fn close(&mut self) {}
}

/// Blocking HTTP endpoint posting `application/json` bodies to one URL.
#[derive(Debug)]
pub struct HttpEndpoint {
    url: String,
    client: Option<Client>,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        // the blocking client defaults to a 30 s timeout; calls must be
        // allowed to take as long as the server needs
        let client = Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client: Some(client),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Endpoint for HttpEndpoint {
    fn post(&mut self, body: &Value) -> Result<Value, ClientError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ClientError::Transport("HTTP client already closed".to_string()))?;

        let response = client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Transport(format!(
                "Server returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .map_err(|e| ClientError::Transport(format!("invalid JSON body: {}", e)))
    }

    fn close(&mut self) {
        self.client = None;
    }
}

/// JSON-RPC transport over an [`Endpoint`].
#[derive(Debug)]
pub struct Transport<E> {
    endpoint: E,
    ids: RequestIds,
}

impl<E: Endpoint> Transport<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            ids: RequestIds::new(),
        }
    }

    /// Sends one call. Failures are not retried.
    pub fn send(&mut self, method: &str, params: Vec<Value>) -> Result<RawResponse, ClientError> {
        let request = Request::new(self.ids.next_id(), method, params);
        let body =
            serde_json::to_value(&request).map_err(|e| ClientError::Protocol(e.to_string()))?;
        debug!("JSON-RPC request: {}", redact(&request));

        let reply = self.endpoint.post(&body)?;
        debug!("JSON-RPC response: {}", reply);

        RawResponse::decode(reply, &request)
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn close(&mut self) {
        self.endpoint.close();
    }
}

/// Renders a request for logging without the password of `get_session_key`.
fn redact(request: &Request) -> String {
    if request.method == "get_session_key" {
        format!("{{id: {}, method: get_session_key, params: [***]}}", request.id)
    } else {
        format!(
            "{{id: {}, method: {}, params: {}}}",
            request.id,
            request.method,
            Value::Array(request.params.clone())
        )
    }
}
