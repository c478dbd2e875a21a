//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ApiError, Result};
use crate::executor::RetryPolicy;
use crate::normalize::DocumentFormat;

pub const DEFAULT_BASE_URL: &str = "https://www.boe.es/datosabiertos/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 5;

/// Settings for [`crate::BoeClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub max_retries: u32,
    /// Base backoff; attempt `i` waits `retry_delay * (i + 1)`.
    pub retry_delay: Duration,
    pub user_agent: String,
    /// Upper bound on connections in flight at once.
    pub max_connections: usize,
    /// Idle keep-alive slots kept per host.
    pub max_idle_per_host: usize,
    pub default_format: DocumentFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: format!("boe-client/{}", env!("CARGO_PKG_VERSION")),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
            default_format: DocumentFormat::Json,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_default_format(mut self, format: DocumentFormat) -> Self {
        self.default_format = format;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }

    /// Rejects settings the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|_| ApiError::validation("base_url", &self.base_url, "an absolute URL"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::validation("base_url", &self.base_url, "an http(s) URL"));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::validation("timeout", "0", "a positive duration"));
        }
        if self.max_connections == 0 {
            return Err(ApiError::validation("max_connections", "0", "at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(ClientConfig::new().with_base_url("not a url").validate().is_err());
        assert!(ClientConfig::new().with_base_url("ftp://x").validate().is_err());
        assert!(ClientConfig::new().with_timeout(Duration::ZERO).validate().is_err());
        assert!(ClientConfig::new().with_max_connections(0).validate().is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = ClientConfig::new()
            .with_max_retries(0)
            .with_retry_delay(Duration::from_millis(10))
            .retry_policy();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.retry_delay, Duration::from_millis(10));
    }
}
