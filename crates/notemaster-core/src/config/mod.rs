//! Client configuration.
//!
//! Resolves the base URL of the remote note service from explicit values,
//! the environment, or the built-in development default.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{normalize_base_url, normalize_text_option};

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "NOTEMASTER_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Build a config for an explicit base URL.
    pub fn new(api_base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url.as_ref()).map_err(Error::Config)?,
        })
    }

    /// Resolve the base URL: explicit value first, then `NOTEMASTER_API_URL`,
    /// then [`DEFAULT_API_BASE_URL`].
    pub fn resolve(explicit: Option<String>) -> Result<Self> {
        Self::resolve_with_env(explicit, std::env::var(API_URL_ENV).ok())
    }

    fn resolve_with_env(explicit: Option<String>, env_value: Option<String>) -> Result<Self> {
        match normalize_text_option(explicit).or_else(|| normalize_text_option(env_value)) {
            Some(url) => Self::new(url),
            None => Ok(Self::default()),
        }
    }
}
