//! Gateway Configuration
//!
//! Connection settings for the remote messaging backend. A config can be
//! assembled programmatically through the builder, loaded from a TOML file,
//! or read from `ZAPLINK_BASE_URL` / `ZAPLINK_TOKEN` environment variables.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Application identifier stamped into every outbound message payload.
pub const DEFAULT_APP_NAME: &str = "darinfo-app";

/// Client version reported to the backend.
pub const DEFAULT_APP_VERSION: &str = "1.0.0";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("missing value: {0}")]
    MissingValue(&'static str),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    base_url: String,
    auth_token: Option<String>,
    request_timeout: Duration,
    app_name: String,
    app_version: String,
}

impl GatewayConfig {
    /// Start building a configuration
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Load configuration from the environment.
    ///
    /// `ZAPLINK_BASE_URL` is required; `ZAPLINK_TOKEN` is optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("ZAPLINK_BASE_URL")
            .map_err(|_| ConfigError::MissingValue("ZAPLINK_BASE_URL"))?;
        let mut builder = Self::builder().base_url(base_url);
        if let Ok(token) = std::env::var("ZAPLINK_TOKEN") {
            if !token.is_empty() {
                builder = builder.auth_token(token);
            }
        }
        builder.build()
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let file: GatewayConfigFile = toml::from_str(&content)?;

        let mut builder = Self::builder();
        if let Some(base_url) = file.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(token) = file.auth_token {
            builder = builder.auth_token(token);
        }
        if let Some(secs) = file.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(app_name) = file.app_name {
            builder = builder.app_name(app_name);
        }
        if let Some(app_version) = file.app_version {
            builder = builder.app_version(app_version);
        }
        builder.build()
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }
}

/// Builder for [`GatewayConfig`]
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    base_url: Option<String>,
    auth_token: Option<String>,
    request_timeout: Option<Duration>,
    app_name: Option<String>,
    app_version: Option<String>,
}

impl GatewayConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<GatewayConfig, ConfigError> {
        let base_url = self.base_url.ok_or(ConfigError::MissingValue("base_url"))?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(base_url));
        }

        Ok(GatewayConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: self.auth_token,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            app_name: self.app_name.unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            app_version: self
                .app_version
                .unwrap_or_else(|| DEFAULT_APP_VERSION.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GatewayConfigFile {
    base_url: Option<String>,
    auth_token: Option<String>,
    request_timeout_secs: Option<u64>,
    app_name: Option<String>,
    app_version: Option<String>,
}
