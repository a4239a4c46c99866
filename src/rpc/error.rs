//! Client error types.

use std::path::PathBuf;

/// Errors that can occur while talking to the survey server or persisting
/// its exports.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network or HTTP failure, or a body that is not JSON
    #[error("Transport error: {0}")]
    Transport(String),
    /// Response id mismatch or unparseable JSON-RPC envelope
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// Session key could not be obtained
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// Call issued while the session is not open
    #[error("Invalid session state: {0}")]
    InvalidState(String),
    /// Normalized failure reported by the server for a specific call
    #[error("Remote error {code}: {message}")]
    Remote { code: i64, message: String },
    /// Response references a token missing from the participant list
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
    /// Response payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
    /// Reading or writing a persisted export failed
    #[error("Artifact error at '{}': {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Credential store missing an entry or malformed
    #[error("Credentials error: {0}")]
    Credentials(String),
}

impl ClientError {
    /// Returns true for errors that abort the whole run.
    ///
    /// Remote, decode, integrity and artifact errors only affect the survey
    /// or record being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_)
                | ClientError::Protocol(_)
                | ClientError::Authentication(_)
                | ClientError::InvalidState(_)
                | ClientError::Credentials(_)
        )
    }
}
