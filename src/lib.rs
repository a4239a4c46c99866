//! Psytools Sync Library
//!
//! Downloads questionnaire responses from a LimeSurvey server through its
//! RemoteControl 2 (LSRC2) JSON-RPC API and stores them per survey as
//! canonical JSON, keyed by subject identifier instead of survey token.

pub mod config;
pub mod credentials;
pub mod models;
pub mod rpc;
pub mod sync;

pub use config::{Config, ConfigError};
pub use credentials::{CredentialStore, Credentials};
pub use models::{Participant, Survey};
pub use rpc::{ClientError, HttpEndpoint, Session, SessionOptions};
pub use sync::{connect, SyncOptions, SyncReport, Synchronizer};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
