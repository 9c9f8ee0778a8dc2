//! Runtime configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Open Food Facts v0 product endpoint. Product URLs are `{base}{code}.json`.
pub const DEFAULT_API_BASE_URL: &str = "https://world.openfoodfacts.org/api/v0/product/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of background operations allowed at once
/// (one product fetch plus one image fetch).
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// User agent sent with every request unless overridden.
pub fn default_user_agent() -> String {
    format!("foodscan/{}", env!("CARGO_PKG_VERSION"))
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct FoodscanConfig {
    /// Base URL the product path segment is appended to.
    pub api_base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Upper bound on concurrently running background operations.
    pub max_concurrent: usize,
}

impl Default for FoodscanConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl FoodscanConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `FOODSCAN_API_BASE_URL`: product endpoint base (default: Open Food Facts v0)
    /// - `FOODSCAN_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    /// - `FOODSCAN_USER_AGENT`: User-Agent header (default: "foodscan/<version>")
    /// - `FOODSCAN_MAX_CONCURRENT`: background operation limit, at least 1 (default: 2)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("FOODSCAN_API_BASE_URL").unwrap_or(defaults.api_base_url);
        url::Url::parse(&api_base_url).map_err(|e| ConfigError::InvalidValue {
            var: "FOODSCAN_API_BASE_URL".to_string(),
            reason: e.to_string(),
        })?;

        let timeout = match lookup("FOODSCAN_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_var("FOODSCAN_TIMEOUT_SECS", &v)?),
            None => defaults.timeout,
        };

        let user_agent = lookup("FOODSCAN_USER_AGENT").unwrap_or(defaults.user_agent);

        let max_concurrent = match lookup("FOODSCAN_MAX_CONCURRENT") {
            Some(v) => parse_var::<usize>("FOODSCAN_MAX_CONCURRENT", &v)?,
            None => defaults.max_concurrent,
        };
        if max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                var: "FOODSCAN_MAX_CONCURRENT".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            api_base_url,
            timeout,
            user_agent,
            max_concurrent,
        })
    }
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: e.to_string(),
        })
}
