//! Configuration module

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

const ENV_PREFIX: &str = "TUYA_BRIDGE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid API url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base endpoint of the Tuya cloud API, e.g. `https://openapi.tuyaeu.com`
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "clientID", alias = "clientid")]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default, alias = "deviceList", alias = "devicelist")]
    pub device_list: Vec<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_auth_retry_secs")]
    pub auth_retry_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_auth_retry_secs() -> u64 {
    65
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8581
}

impl Config {
    /// Load `config/default` (optional) overlaid with `TUYA_BRIDGE__*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(config::File::with_name("config/default").required(false))
    }

    /// Build from one file source plus the environment, then validate.
    ///
    /// Keys are lowercased by the loader, so `clientID` arrives as `clientid`.
    fn from_sources<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("device_list")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Missing("url"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("client_id"));
        }
        if self.secret.is_empty() {
            return Err(ConfigError::Missing("secret"));
        }

        let parsed = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: "not a base URL".to_string(),
            });
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.auth_retry_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "auth_retry_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn auth_retry_delay(&self) -> Duration {
        Duration::from_secs(self.auth_retry_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_config(url: &str, devices: &[&str]) -> Config {
    Config {
        url: url.to_string(),
        client_id: "client-id".to_string(),
        secret: "bootstrap-secret".to_string(),
        device_list: devices.iter().map(|d| d.to_string()).collect(),
        poll_interval_ms: 20,
        auth_retry_secs: 1,
        request_timeout_secs: 2,
        server: ServerConfig::default(),
    }
}
