//! Credential lookup from a netrc-format file.
//!
//! Entries are keyed by the network location (`host[:port]`) of the server
//! URL, so several servers can share one file:
//!
//! ```text
//! machine www.delosis.com login imagen password s3cret
//! default login anonymous password guest
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::rpc::ClientError;

/// Username and password for one server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Default)]
struct Entry {
    machine: Option<String>,
    login: Option<String>,
    password: Option<String>,
}

/// Parsed credential file.
#[derive(Debug, Default)]
pub struct CredentialStore {
    entries: Vec<Entry>,
}

impl CredentialStore {
    /// Loads a credential file. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents)
                .map_err(|e| ClientError::Credentials(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ClientError::Credentials(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parses netrc syntax.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        let mut current: Option<Entry> = None;
        let mut lines = contents.lines();

        while let Some(line) = lines.next() {
            let mut tokens = line.split_whitespace();
            while let Some(token) = tokens.next() {
                if token.starts_with('#') {
                    break;
                }
                match token {
                    "machine" => {
                        entries.extend(current.take());
                        let name = tokens
                            .next()
                            .ok_or_else(|| "missing name after 'machine'".to_string())?;
                        current = Some(Entry {
                            machine: Some(name.to_string()),
                            ..Entry::default()
                        });
                    }
                    "default" => {
                        entries.extend(current.take());
                        current = Some(Entry::default());
                    }
                    "login" | "password" | "account" => {
                        let value = tokens
                            .next()
                            .ok_or_else(|| format!("missing value after '{}'", token))?;
                        let entry = current
                            .as_mut()
                            .ok_or_else(|| format!("'{}' outside of a machine entry", token))?;
                        match token {
                            "login" => entry.login = Some(value.to_string()),
                            "password" => entry.password = Some(value.to_string()),
                            _ => {}
                        }
                    }
                    "macdef" => {
                        // macro body runs until the next blank line
                        for body in lines.by_ref() {
                            if body.trim().is_empty() {
                                break;
                            }
                        }
                        break;
                    }
                    other => return Err(format!("unexpected token '{}'", other)),
                }
            }
        }
        entries.extend(current);

        Ok(Self { entries })
    }

    /// Returns the credentials for a network location, falling back to the
    /// `default` entry.
    pub fn authenticators(&self, netloc: &str) -> Option<Credentials> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.machine.as_deref() == Some(netloc))
            .or_else(|| self.entries.iter().find(|e| e.machine.is_none()))?;

        Some(Credentials {
            username: entry.login.clone().unwrap_or_default(),
            password: entry.password.clone()?,
        })
    }

    /// Returns the credentials for the server at `url`.
    pub fn resolve(&self, url: &str) -> Result<Option<Credentials>, ClientError> {
        Ok(self.authenticators(&netloc(url)?))
    }
}

/// Network location of a URL: host, plus the port when explicit.
pub fn netloc(url: &str) -> Result<String, ClientError> {
    let parsed = Url::parse(url).map_err(|e| ClientError::Credentials(format!("{}: {}", url, e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ClientError::Credentials(format!("{}: missing host", url)))?;
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Default credential file: `~/.lsrc2`.
pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lsrc2")
}
