use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("cache url must not be empty")]
    EmptyCacheUrl,

    #[error("refresh interval must be at least one hour")]
    InvalidRefreshInterval,
}

/// Remote advertising API endpoints and request defaults.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DirectApi {
    /// Base URL of the JSON API, e.g. "https://api.direct.yandex.com/json/v5".
    ///
    /// Note: Uses the `url::Url` type for compile-time URL validation.
    /// Invalid URLs will be rejected during config deserialization.
    pub base_url: Url,
    /// Value sent as `Accept-Language` on every request.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "ru".to_string()
}

/// Backing store for cached reports.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CacheStore {
    /// Connection URL, e.g. "redis://127.0.0.1:6379".
    pub url: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Refresh {
    /// How often the refresh worker rebuilds every account's cache entry.
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
}

fn default_interval_hours() -> u64 {
    24
}

impl Default for Refresh {
    fn default() -> Self {
        Refresh {
            interval_hours: default_interval_hours(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub direct: DirectApi,
    pub cache: CacheStore,
    #[serde(default)]
    pub refresh: Refresh,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cache.url.is_empty() {
            return Err(ValidationError::EmptyCacheUrl);
        }
        if self.refresh.interval_hours == 0 {
            return Err(ValidationError::InvalidRefreshInterval);
        }
        Ok(())
    }
}
