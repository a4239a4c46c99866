//! Synchronization of survey responses to local JSON files.
//!
//! For each survey the server lists, participants are fetched to build the
//! token → subject identifier correlation, responses are exported and
//! re-keyed, and the result is written as canonical JSON. Files whose
//! content did not change are left untouched, so repeated runs produce no
//! filesystem churn.
//!
//! # Usage
//!
//! ```no_run
//! use psytools_sync::config::Config;
//! use psytools_sync::sync::{connect, Synchronizer};
//!
//! let config = Config::load(None)?;
//! let mut session = connect(&config)?;
//! let report = Synchronizer::from_config(&config).run(&mut session)?;
//! println!("{} file(s) written", report.written());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod artifact;
pub mod canonical;
pub mod rekey;
pub mod synchronizer;

pub use artifact::{file_stem, ArtifactStatus, ArtifactStore};
pub use canonical::to_canonical_string;
pub use rekey::{rekey_responses, IdentifierMap, Rekeyed};
pub use synchronizer::{SurveyReport, SurveyStatus, SyncOptions, SyncReport, Synchronizer};

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::rpc::{ClientError, HttpEndpoint, Session, SessionOptions};

impl Synchronizer {
    /// Creates a synchronizer writing to the configured output directory.
    pub fn from_config(config: &Config) -> Self {
        Synchronizer::new(
            ArtifactStore::new(config.output_dir.value.clone()),
            SyncOptions {
                identifier_attribute: config.identifier_attribute.clone(),
                response_status: config.response_status.clone(),
            },
        )
    }
}

/// Opens an authenticated session with the configured server.
///
/// Credentials come from the configured credential file, keyed by the
/// server's network location.
pub fn connect(config: &Config) -> Result<Session<HttpEndpoint>, ClientError> {
    let url = config.server_url.value.as_str();
    let credentials_file = &config.credentials_file.value;

    let credentials = CredentialStore::load(credentials_file)?
        .resolve(url)?
        .ok_or_else(|| {
            ClientError::Credentials(format!(
                "no entry for {} in {}",
                url,
                credentials_file.display()
            ))
        })?;

    let options = SessionOptions {
        participant_limit: config.participant_limit,
        language: config.language.clone(),
    };
    Session::open(
        HttpEndpoint::new(url)?,
        options,
        &credentials.username,
        &credentials.password,
    )
}
