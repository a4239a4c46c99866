//! Replacing participant tokens with subject identifiers.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::models::Participant;
use crate::rpc::ClientError;

/// Token → subject identifier correlation for one survey.
#[derive(Debug, Default, Clone)]
pub struct IdentifierMap {
    by_token: HashMap<String, String>,
}

impl IdentifierMap {
    /// Indexes participants by token, reading the identifier from
    /// `attribute`. Participants without a token or identifier are left out.
    pub fn from_participants(participants: &[Participant], attribute: &str) -> Self {
        let mut by_token = HashMap::with_capacity(participants.len());
        for participant in participants {
            let Some(token) = participant.token.as_deref().filter(|t| !t.is_empty()) else {
                warn!("Participant {} has no token", participant.tid);
                continue;
            };
            let Some(identifier) = participant.attribute(attribute) else {
                warn!(
                    "Participant {} (token {}) has no '{}'",
                    participant.tid, token, attribute
                );
                continue;
            };
            by_token.insert(token.to_string(), identifier.to_string());
        }
        Self { by_token }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.by_token.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}

impl FromIterator<(String, String)> for IdentifierMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            by_token: iter.into_iter().collect(),
        }
    }
}

/// An export with its responses keyed by subject identifier.
#[derive(Debug)]
pub struct Rekeyed {
    pub document: Value,
    /// Number of responses kept
    pub kept: usize,
    /// One error per dropped response
    pub dropped: Vec<ClientError>,
}

/// Re-keys every response of an export document.
///
/// Each element of `responses` maps a response key to the answers. The
/// token is the answers' `token` field, or the key itself when absent.
/// Responses whose token is unknown are dropped; the rest of the document
/// is kept as is.
pub fn rekey_responses(mut document: Value, ids: &IdentifierMap) -> Rekeyed {
    let mut kept = 0;
    let mut dropped = Vec::new();

    let records = match document.get_mut("responses").map(Value::take) {
        Some(Value::Array(records)) => records,
        Some(other) => {
            document["responses"] = other;
            return Rekeyed {
                document,
                kept,
                dropped,
            };
        }
        None => {
            return Rekeyed {
                document,
                kept,
                dropped,
            }
        }
    };

    let mut rekeyed = Vec::with_capacity(records.len());
    for record in records {
        let entries = match record {
            Value::Object(entries) => entries,
            other => {
                let err =
                    ClientError::DataIntegrity(format!("response is not a mapping: {}", other));
                warn!("{}", err);
                dropped.push(err);
                continue;
            }
        };

        let mut out = Map::new();
        for (key, answers) in entries {
            let token = answers
                .get("token")
                .and_then(Value::as_str)
                .unwrap_or(&key)
                .to_string();
            match ids.get(&token) {
                Some(identifier) => {
                    out.insert(identifier.to_string(), answers);
                    kept += 1;
                }
                None => {
                    let err = ClientError::DataIntegrity(format!(
                        "response token '{}' not found among participants",
                        token
                    ));
                    warn!("{}", err);
                    dropped.push(err);
                }
            }
        }
        if !out.is_empty() {
            rekeyed.push(Value::Object(out));
        }
    }
    document["responses"] = Value::Array(rekeyed);

    Rekeyed {
        document,
        kept,
        dropped,
    }
}
