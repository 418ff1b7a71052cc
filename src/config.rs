//! read SDK configuration from a file, the environment, or explicit values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::errors::Error;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Placeholder in `base_url` replaced by the target service name.
pub const SERVICE_PLACEHOLDER: &str = "{service}";

#[derive(Clone, Debug, Deserialize)]
pub struct SdkConfig {
    pub project_id: String,
    pub api_key: String,
    pub base_url: String,
    /// Arm a background refresh ahead of expiry after every successful refresh.
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
    /// Read from `request_timeout_secs` in files and the environment.
    #[serde(
        default,
        rename = "request_timeout_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub request_timeout: Option<Duration>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Wrapped { sdk_config: SdkConfig },
    Flat(SdkConfig),
}

fn default_auto_refresh() -> bool {
    true
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

impl SdkConfig {
    pub fn from_values(
        project_id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            auto_refresh: true,
            request_timeout: None,
        }
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Reads a JSON file holding either the bare config object or one nested
    /// under `sdk_config`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = match serde_json::from_str::<ConfigFile>(&contents)? {
            ConfigFile::Wrapped { sdk_config } => sdk_config,
            ConfigFile::Flat(config) => config,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, Error> {
        let auto_refresh = match std::env::var("SDK_AUTO_REFRESH") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| {
                Error::Config(format!("SDK_AUTO_REFRESH must be true or false, got '{raw}'"))
            })?,
            Err(_) => true,
        };
        let request_timeout = match std::env::var("SDK_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|e| {
                Error::Config(format!("Invalid SDK_REQUEST_TIMEOUT_SECS '{raw}': {e}"))
            })?)),
            Err(_) => None,
        };
        let config = Self {
            project_id: std::env::var("SDK_PROJECT_ID")
                .map_err(|_| Error::Config("Missing SDK_PROJECT_ID env var".to_string()))?,
            api_key: std::env::var("SDK_API_KEY")
                .map_err(|_| Error::Config("Missing SDK_API_KEY env var".to_string()))?,
            base_url: std::env::var("SDK_BASE_URL")
                .map_err(|_| Error::Config("Missing SDK_BASE_URL env var".to_string()))?,
            auto_refresh,
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.project_id.trim().is_empty() {
            return Err(Error::Config("project_id is required".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("api_key is required".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url is required".into()));
        }
        let probe = self.base_url.replace(SERVICE_PLACEHOLDER, "service");
        reqwest::Url::parse(&probe).map_err(|e| {
            Error::Config(format!("Invalid base_url '{}': {}", self.base_url, e))
        })?;
        if self.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::Config("request timeout must be > 0".into()));
        }
        Ok(())
    }

    pub fn effective_request_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
