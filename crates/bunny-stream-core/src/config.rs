//! Configuration module
//!
//! Client settings come from explicit options first and the process
//! environment second. The access key is never defaulted.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://video.bunnycdn.com";
pub const BASE_URL_ENV: &str = "BUNNY_STREAM_BASE_URL";
pub const ACCESS_KEY_ENV: &str = "BUNNY_STREAM_ACCESS_KEY";
pub const LIBRARY_ID_ENV: &str = "BUNNY_STREAM_LIBRARY_ID";

pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// Base URL and access key for the remote API.
///
/// Both values are validated on construction and cannot change afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    access_key: String,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        let access_key = access_key.into();

        if base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if access_key.trim().is_empty() {
            return Err(ConfigError::MissingAccessKey);
        }

        Ok(Self {
            base_url,
            access_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Concatenates the base URL and the endpoint as-is. Separators are the
    /// caller's responsibility.
    pub fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Explicit client options. Unset fields fall back to the environment.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub access_key: Option<String>,
    pub library_id: Option<u64>,
    pub timeout: Option<Duration>,
}

/// Fully resolved settings for a stream client.
#[derive(Clone, Debug)]
pub struct StreamSettings {
    pub config: ClientConfig,
    pub default_library_id: Option<u64>,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    pub fn library_id(mut self, library_id: u64) -> Self {
        self.library_id = Some(library_id);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<StreamSettings, ConfigError> {
        self.resolve_with(read_env)
    }

    /// Resolve against an arbitrary variable lookup. Empty values count as unset.
    pub fn resolve_with<F>(self, lookup: F) -> Result<StreamSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = non_empty(self.base_url)
            .or_else(|| lookup(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let access_key = non_empty(self.access_key)
            .or_else(|| lookup(ACCESS_KEY_ENV))
            .ok_or(ConfigError::MissingAccessKey)?;

        let default_library_id = match self.library_id {
            Some(id) => Some(id),
            None => lookup(LIBRARY_ID_ENV)
                .map(|value| parse_library_id(&value))
                .transpose()?,
        };

        Ok(StreamSettings {
            config: ClientConfig::new(base_url, access_key)?,
            default_library_id,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(HTTP_TIMEOUT_SECS)),
        })
    }
}

/// Read an environment variable, treating absence and invalid unicode alike.
pub fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub fn parse_library_id(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidLibraryId {
            value: value.to_string(),
        })
}

/// Per-call library ID wins over the client default.
pub fn resolve_library_id(
    call_param: Option<u64>,
    client_default: Option<u64>,
) -> Result<u64, ConfigError> {
    call_param
        .or(client_default)
        .ok_or(ConfigError::MissingLibraryId)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
