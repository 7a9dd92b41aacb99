//! Settings file management

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::errors::ClientError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Client settings
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Write JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Log tail configuration
    #[serde(default)]
    pub tail: TailSettings,

    /// Upload configuration
    #[serde(default)]
    pub upload: UploadSettings,
}

impl Settings {
    /// Load settings from `file`, falling back to defaults when it is missing
    pub async fn load(file: &File) -> Result<Self, ClientError> {
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json().await
    }
}

/// Backend API settings
#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the SwarmHub server
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound for a whole upload in seconds; unbounded when unset
    #[serde(default)]
    pub upload_timeout_secs: Option<u64>,

    /// Value of the `Authorization` cookie, forwarded as is
    #[serde(default, deserialize_with = "secret_opt")]
    pub auth_cookie: Option<SecretString>,
}

fn secret_opt<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(SecretString::from))
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
            upload_timeout_secs: None,
            auth_cookie: None,
        }
    }
}

/// Log tail settings
#[derive(Debug, Clone, Deserialize)]
pub struct TailSettings {
    /// Polling interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Failed fetches in a row before tailing gives up
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,

    /// Longest retry delay in seconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_poll_interval() -> u64 {
    3000
}

fn default_max_failures() -> u32 {
    5
}

fn default_max_backoff() -> u64 {
    30
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_consecutive_failures: default_max_failures(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

/// Upload settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadSettings {
    /// Keep the typed name and description when a submission fails
    #[serde(default)]
    pub preserve_draft_on_failure: bool,
}
