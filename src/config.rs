use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::constants;
use crate::error::ConfigError;

/// Credential fields read from the JSON run configuration.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "CLIENT_ID")]
    pub client_id: String,
    #[serde(rename = "CLIENT_PASS")]
    pub client_pass: String,
    #[serde(rename = "CLIENT_SECRET")]
    pub client_secret: String,
    #[serde(rename = "OCP_APIM_SUBSCRIPTION_KEY")]
    pub subscription_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_pass", &"<redacted>")
            .field("client_secret", &"<redacted>")
            .field("subscription_key", &"<redacted>")
            .finish()
    }
}

/// Loads the credentials file. Unknown keys are ignored; the four credential keys are required.
pub fn load_credentials(path: impl AsRef<Path>) -> Result<Credentials, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let credentials: Credentials =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), client_id = %credentials.client_id, "Loaded credentials");
    Ok(credentials)
}

/// Where and how to reach the chat service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub endpoint: String,
    /// `None` connects directly.
    pub proxy: Option<String>,
    pub image_base_url: String,
    pub application_id: u32,
    pub response_timeout: Duration,
}

impl ServiceSettings {
    /// Settings from the environment-backed defaults in [`constants`].
    pub fn from_env() -> Self {
        let proxy = match constants::PROXY_URL.trim() {
            "" | "none" => None,
            url => Some(url.to_string()),
        };
        let settings = Self {
            endpoint: constants::SERVICE_ENDPOINT.clone(),
            proxy,
            image_base_url: constants::IMAGE_BASE_URL.clone(),
            application_id: *constants::APPLICATION_ID,
            response_timeout: Duration::from_secs(constants::RESPONSE_TIMEOUT_SECS),
        };
        debug!(?settings, "Resolved service settings");
        settings
    }

    /// Settings for reaching `endpoint` without a proxy. Everything else keeps the
    /// environment-backed defaults.
    pub fn direct(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            proxy: None,
            image_base_url: constants::IMAGE_BASE_URL.clone(),
            application_id: *constants::APPLICATION_ID,
            response_timeout: Duration::from_secs(constants::RESPONSE_TIMEOUT_SECS),
        }
    }
}

/// Resolves the credentials path relative to the working directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_CONFIG_FILE))
}
