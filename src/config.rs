use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::credentials::default_credentials_path;

/// LSRC2 endpoint used when no server is configured.
pub const DEFAULT_SERVER_URL: &str = "https://www.delosis.com/qs/index.php/admin/remotecontrol";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// LSRC2 RemoteControl endpoint
    pub server_url: ConfigValue<String>,
    /// Directory receiving one JSON file per survey
    pub output_dir: ConfigValue<PathBuf>,
    /// netrc-format file holding the server credentials
    pub credentials_file: ConfigValue<PathBuf>,
    /// Participant attribute holding the subject identifier
    pub identifier_attribute: String,
    /// Response filter: all, complete or incomplete
    pub response_status: String,
    /// Language of exported answers
    pub language: String,
    /// Maximum number of participants listed per survey
    pub participant_limit: u32,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    server_url: Option<String>,
    output_dir: Option<PathBuf>,
    credentials_file: Option<PathBuf>,
    identifier_attribute: Option<String>,
    response_status: Option<String>,
    language: Option<String>,
    participant_limit: Option<u32>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut server_url =
            ConfigValue::new(DEFAULT_SERVER_URL.to_string(), ConfigSource::Default);
        let mut output_dir = ConfigValue::new(Self::default_output_dir(), ConfigSource::Default);
        let mut credentials_file =
            ConfigValue::new(default_credentials_path(), ConfigSource::Default);
        let mut identifier_attribute = "attribute_1".to_string();
        let mut response_status = "all".to_string();
        let mut language = "fr".to_string();
        let mut participant_limit = 5000;
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.server_url {
                server_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(dir) = file_config.output_dir {
                output_dir = ConfigValue::new(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(file) = file_config.credentials_file {
                credentials_file =
                    ConfigValue::new(resolve_relative(&path, file), ConfigSource::File);
            }
            if let Some(attribute) = file_config.identifier_attribute {
                identifier_attribute = attribute;
            }
            if let Some(status) = file_config.response_status {
                response_status = status;
            }
            if let Some(lang) = file_config.language {
                language = lang;
            }
            if let Some(limit) = file_config.participant_limit {
                participant_limit = limit;
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("PSYTOOLS_SERVER_URL") {
            server_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("PSYTOOLS_OUTPUT_DIR") {
            output_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(file) = std::env::var("PSYTOOLS_CREDENTIALS_FILE") {
            credentials_file = ConfigValue::new(PathBuf::from(file), ConfigSource::Environment);
        }

        if !matches!(response_status.as_str(), "all" | "complete" | "incomplete") {
            return Err(ConfigError::InvalidValue(
                "response_status".to_string(),
                response_status,
            ));
        }

        Ok(Self {
            server_url,
            output_dir,
            credentials_file,
            identifier_attribute,
            response_status,
            language,
            participant_limit,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/psytools-sync/
    /// - macOS: ~/Library/Application Support/psytools-sync/
    /// - Windows: %APPDATA%/psytools-sync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("psytools-sync")
    }

    /// Default output directory: <data dir>/psytools-sync/psytools
    pub fn default_output_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("psytools-sync")
            .join("psytools")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolves relative paths against the config file's directory
fn resolve_relative(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, value) => {
                write!(f, "Invalid value for '{}': {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
