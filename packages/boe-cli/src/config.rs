use anyhow::{Context, Result};
use boe_client::ClientConfig;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Client settings with overrides from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut client = ClientConfig::default();

        if let Some(base_url) = var("BOE_BASE_URL") {
            client = client.with_base_url(base_url);
        }
        if let Some(secs) = var("BOE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .context("BOE_TIMEOUT_SECS must be a whole number of seconds")?;
            client = client.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = var("BOE_MAX_RETRIES") {
            let retries: u32 = retries
                .trim()
                .parse()
                .context("BOE_MAX_RETRIES must be a non-negative number")?;
            client = client.with_max_retries(retries);
        }
        if let Some(millis) = var("BOE_RETRY_DELAY_MS") {
            let millis: u64 = millis
                .trim()
                .parse()
                .context("BOE_RETRY_DELAY_MS must be a number of milliseconds")?;
            client = client.with_retry_delay(Duration::from_millis(millis));
        }
        if let Some(user_agent) = var("BOE_USER_AGENT") {
            client = client.with_user_agent(user_agent);
        }

        client
            .validate()
            .context("Invalid BOE client configuration")?;

        Ok(Self { client })
    }
}
