//! LSRC2 session lifecycle.
//!
//! A [`Session`] starts unauthenticated, becomes open once a session key is
//! obtained, and is closed when the key is released. Release happens at
//! most once, either through [`Session::release`] or when the session is
//! dropped, so every exit path of a run gives the key back.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::ClientError;
use super::outcome::{normalize, status_of, CallKind, Outcome, NO_RESPONSES, STATUS_ERROR_CODE};
use super::transport::{Endpoint, Transport};
use crate::models::{Participant, Survey};

/// Session lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Open { key: String },
    Closed,
}

/// Parameters sent with listing and export calls.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum number of participants returned by `list_participants`
    pub participant_limit: u32,
    /// Language of exported answers
    pub language: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            participant_limit: 5000,
            language: "fr".to_string(),
        }
    }
}

/// An LSRC2 RemoteControl session.
#[derive(Debug)]
pub struct Session<E: Endpoint> {
    transport: Transport<E>,
    state: SessionState,
    options: SessionOptions,
}

impl<E: Endpoint> Session<E> {
    /// Creates an unauthenticated session.
    pub fn new(endpoint: E) -> Self {
        Self::with_options(endpoint, SessionOptions::default())
    }

    pub fn with_options(endpoint: E, options: SessionOptions) -> Self {
        Self {
            transport: Transport::new(endpoint),
            state: SessionState::Unauthenticated,
            options,
        }
    }

    /// Creates a session and authenticates it.
    pub fn open(
        endpoint: E,
        options: SessionOptions,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let mut session = Self::with_options(endpoint, options);
        session.authenticate(username, password)?;
        Ok(session)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    pub fn transport(&self) -> &Transport<E> {
        &self.transport
    }

    /// Obtains a session key.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        if self.state != SessionState::Unauthenticated {
            return Err(ClientError::InvalidState(format!(
                "cannot authenticate a session in state {:?}",
                self.state
            )));
        }

        let raw = self.transport.send(
            CallKind::SessionKey.method(),
            vec![json!(username), json!(password)],
        )?;

        match normalize(CallKind::SessionKey, &raw) {
            Outcome::Success(Value::String(key)) => {
                info!("LSRC2 new session key");
                self.state = SessionState::Open { key };
                Ok(())
            }
            Outcome::Success(other) => Err(ClientError::Authentication(format!(
                "unexpected session key: {}",
                other
            ))),
            Outcome::Failure { message, .. } => {
                tracing::error!("LSRC2 failed to create a session key: {}", message);
                Err(ClientError::Authentication(message))
            }
        }
    }

    /// Releases the session key and the underlying connection.
    ///
    /// The server answers `OK` even for a bogus key, so the outcome is
    /// ignored. Calling this more than once has no further effect.
    pub fn release(&mut self) {
        let state = std::mem::replace(&mut self.state, SessionState::Closed);
        match state {
            SessionState::Open { key } => {
                info!("LSRC2 release session key");
                if let Err(e) = self.transport.send("release_session_key", vec![json!(key)]) {
                    warn!("Failed to release session key: {}", e);
                }
                self.transport.close();
            }
            SessionState::Unauthenticated => self.transport.close(),
            SessionState::Closed => {}
        }
    }

    fn key(&self) -> Result<String, ClientError> {
        match &self.state {
            SessionState::Open { key } => Ok(key.clone()),
            other => Err(ClientError::InvalidState(format!(
                "session is not open ({:?})",
                other
            ))),
        }
    }

    fn call(&mut self, kind: CallKind, params: Vec<Value>) -> Result<Value, ClientError> {
        let raw = self.transport.send(kind.method(), params)?;
        normalize(kind, &raw).into_result()
    }

    /// Lists the surveys visible to the authenticated user, decoding each
    /// entry on its own so one malformed entry does not hide the others.
    pub fn survey_entries(&mut self) -> Result<Vec<Result<Survey, ClientError>>, ClientError> {
        let key = self.key()?;
        let result = self.call(CallKind::ListSurveys, vec![json!(key)])?;
        let entries = match result {
            Value::Array(entries) => entries,
            other => {
                return Err(ClientError::Decode(format!(
                    "list_surveys returned {}",
                    other
                )))
            }
        };

        Ok(entries
            .into_iter()
            .map(|entry| {
                serde_json::from_value::<Survey>(entry.clone()).map_err(|e| {
                    ClientError::Decode(format!("malformed survey entry {}: {}", entry, e))
                })
            })
            .collect())
    }

    /// Lists the surveys visible to the authenticated user. Malformed
    /// entries are logged and left out.
    pub fn surveys(&mut self) -> Result<Vec<Survey>, ClientError> {
        Ok(self
            .survey_entries()?
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(survey) => Some(survey),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            })
            .collect())
    }

    /// Lists participants of a survey with the requested extra attributes.
    ///
    /// A survey without participants yields an empty list.
    pub fn participants(
        &mut self,
        sid: u64,
        attributes: &[&str],
    ) -> Result<Vec<Participant>, ClientError> {
        let key = self.key()?;
        let params = vec![
            json!(key),
            json!(sid),
            json!(0),
            json!(self.options.participant_limit),
            json!(false),
            json!(attributes),
        ];
        let result = self.call(CallKind::ListParticipants, params)?;
        serde_json::from_value(result).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Reads properties of a single participant.
    ///
    /// `query` is either a token id or a mapping of attribute values.
    pub fn participant_properties(
        &mut self,
        sid: u64,
        query: Value,
        attributes: &[&str],
    ) -> Result<Value, ClientError> {
        let key = self.key()?;
        let params = vec![json!(key), json!(sid), query, json!(attributes)];
        self.call(CallKind::ParticipantProperties, params)
    }

    /// Exports responses of a survey as JSON.
    ///
    /// `status` is one of `all`, `complete` or `incomplete`. A survey
    /// without responses yields `{"responses": []}`.
    pub fn responses(&mut self, sid: u64, status: &str) -> Result<Value, ClientError> {
        let key = self.key()?;
        let params = vec![
            json!(key),
            json!(sid),
            json!("json"),
            json!(self.options.language),
            json!(status),
        ];
        let result = self.call(CallKind::ExportResponses, params)?;
        decode_export(result)
    }
}

impl<E: Endpoint> Drop for Session<E> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Decodes the Base64-wrapped JSON document returned by `export_responses`.
fn decode_export(payload: Value) -> Result<Value, ClientError> {
    let encoded = match payload {
        Value::String(encoded) => encoded,
        // already replaced by the empty result during normalization
        other => return Ok(other),
    };

    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
        .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()));

    match decoded {
        Ok(document) if document.get("responses").is_none() => match status_of(&document) {
            Some(NO_RESPONSES) => Ok(CallKind::ExportResponses.empty_result()),
            Some(status) => Err(ClientError::Remote {
                code: STATUS_ERROR_CODE,
                message: status.to_string(),
            }),
            None => Ok(document),
        },
        Ok(document) => Ok(document),
        Err(_) if encoded.trim() == NO_RESPONSES => Ok(CallKind::ExportResponses.empty_result()),
        Err(e) => Err(ClientError::Decode(format!(
            "export_responses expected a Base64-encoded JSON document: {}",
            e
        ))),
    }
}
