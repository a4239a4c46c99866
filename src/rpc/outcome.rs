//! Normalization of the server's error reporting.
//!
//! LSRC2 reports errors on two channels that often disagree: the JSON-RPC
//! `error` member, and a `{"status": "..."}` mapping returned as a
//! successful `result`. Some of those status mappings mean "no data" and
//! are not errors at all. [`normalize`] folds every response into a single
//! [`Outcome`] by checking shapes in a fixed order.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::envelope::RawResponse;
use super::error::ClientError;

/// Implementation-defined JSON-RPC code for failures reported via `status`.
pub const STATUS_ERROR_CODE: i64 = -32099;
/// JSON-RPC internal error code, used when no known shape is recognized.
pub const UNEXPECTED_SHAPE_CODE: i64 = -32603;

/// Status returned by `list_surveys` when the account has no surveys.
pub const NO_SURVEYS: &str = "No surveys found";
/// Status returned by `list_participants` for a survey without participants.
pub const NO_PARTICIPANTS: &str = "No Tokens found";
/// Status returned by `export_responses` for a survey without responses.
pub const NO_RESPONSES: &str = "No Data, could not get max id.";

/// Result of one remote call once both error channels are reconciled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure { code: i64, message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn into_result(self) -> Result<Value, ClientError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure { code, message } => Err(ClientError::Remote { code, message }),
        }
    }
}

/// Remote methods and the shapes their results take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    SessionKey,
    ListSurveys,
    ListParticipants,
    ParticipantProperties,
    ExportResponses,
}

impl CallKind {
    pub fn method(self) -> &'static str {
        match self {
            CallKind::SessionKey => "get_session_key",
            CallKind::ListSurveys => "list_surveys",
            CallKind::ListParticipants => "list_participants",
            CallKind::ParticipantProperties => "get_participant_properties",
            CallKind::ExportResponses => "export_responses",
        }
    }

    fn is_success_shape(self, result: &Value) -> bool {
        match self {
            CallKind::SessionKey | CallKind::ExportResponses => result.is_string(),
            CallKind::ListSurveys | CallKind::ListParticipants => result.is_array(),
            CallKind::ParticipantProperties => result
                .as_object()
                .is_some_and(|map| !map.contains_key("status")),
        }
    }

    /// Status string meaning "nothing here" for this call, if any.
    pub fn empty_sentinel(self) -> Option<&'static str> {
        match self {
            CallKind::ListSurveys => Some(NO_SURVEYS),
            CallKind::ListParticipants => Some(NO_PARTICIPANTS),
            CallKind::ExportResponses => Some(NO_RESPONSES),
            CallKind::SessionKey | CallKind::ParticipantProperties => None,
        }
    }

    /// Payload standing in for an empty result.
    pub fn empty_result(self) -> Value {
        match self {
            CallKind::ListSurveys | CallKind::ListParticipants => json!([]),
            CallKind::ExportResponses => json!({"responses": []}),
            CallKind::SessionKey | CallKind::ParticipantProperties => Value::Null,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

/// Extracts the `status` string of a status descriptor.
pub fn status_of(result: &Value) -> Option<&str> {
    result.get("status").and_then(Value::as_str)
}

/// Folds a raw response into an [`Outcome`].
///
/// Order matters: the `status` channel is inspected before the JSON-RPC
/// error object, since the server can report an empty survey as an error
/// while also returning the "no data" status.
pub fn normalize(kind: CallKind, raw: &RawResponse) -> Outcome {
    let error = raw.error();

    if kind.is_success_shape(&raw.result) {
        return Outcome::Success(raw.result.clone());
    }

    if let Some(status) = status_of(&raw.result) {
        if kind.empty_sentinel() == Some(status) {
            if let Some(error) = error {
                warn!(
                    "{}: JSON-RPC error report {} does not match status '{}'",
                    kind.method(),
                    error,
                    status
                );
            }
            return Outcome::Success(kind.empty_result());
        }

        if let Some(error) = error {
            warn!(
                "{}: JSON-RPC error report {} overridden by status '{}'",
                kind.method(),
                error,
                status
            );
        }
        return Outcome::Failure {
            code: STATUS_ERROR_CODE,
            message: status.to_string(),
        };
    }

    if let Some(error) = error {
        return match serde_json::from_value::<ErrorObject>(error.clone()) {
            Ok(ErrorObject { code, message }) => Outcome::Failure { code, message },
            Err(_) => Outcome::Failure {
                code: UNEXPECTED_SHAPE_CODE,
                message: "Unexpected JSON-RPC error type".to_string(),
            },
        };
    }

    Outcome::Failure {
        code: UNEXPECTED_SHAPE_CODE,
        message: format!("{}: unexpected result shape: {}", kind.method(), raw.result),
    }
}
