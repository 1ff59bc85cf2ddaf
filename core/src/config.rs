//! Client configuration.

use serde::Deserialize;

use crate::error::ApiError;

/// Path every API url is relative to.
pub const DEFAULT_API_PREFIX: &str = "/api";

pub const BASE_URL_ENV: &str = "ENVELOPE_BASE_URL";
pub const API_PREFIX_ENV: &str = "ENVELOPE_API_PREFIX";

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawConfig")]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
}

/// Deserialized form, normalised through the same path as `new`.
#[derive(Deserialize)]
struct RawConfig {
    base_url: String,
    #[serde(default = "default_api_prefix")]
    api_prefix: String,
}

impl From<RawConfig> for ClientConfig {
    fn from(raw: RawConfig) -> Self {
        ClientConfig::new(&raw.base_url).with_api_prefix(&raw.api_prefix)
    }
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix: default_api_prefix(),
        }
    }

    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Read `ENVELOPE_BASE_URL` (required) and `ENVELOPE_API_PREFIX`.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|_| ApiError::Config(format!("{BASE_URL_ENV} is not set")))?;
        let config = Self::new(&base_url);
        Ok(match std::env::var(API_PREFIX_ENV) {
            Ok(prefix) => config.with_api_prefix(&prefix),
            Err(_) => config,
        })
    }

    /// Absolute url for an API-relative `url`.
    pub fn endpoint(&self, url: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, url)
    }
}
