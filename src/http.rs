//! JSON over HTTP with exponential backoff

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{error_chain, ConfigError, FetchError};

const USER_AGENT_VALUE: &str = concat!("contest-analyzer/", env!("CARGO_PKG_VERSION"));

/// Upper bound of the random delay added to each backoff
const MAX_JITTER_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based), without jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl From<&HttpConfig> for Backoff {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base: Duration::from_millis(config.backoff_base_ms),
            max: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

/// HTTP client bound to one platform session
pub struct JsonClient {
    client: Client,
    backoff: Backoff,
}

impl JsonClient {
    /// `cookie` is sent verbatim with every request
    pub fn new(config: &HttpConfig, cookie: Option<&str>) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|_| ConfigError::Invalid("session cookie contains invalid characters".into()))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            backoff: Backoff::from(config),
        })
    }

    /// GET `url` and decode the body, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let mut attempt = 1;
        loop {
            match self.get_once(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.backoff.max_attempts => {
                    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
                    let delay = self.backoff.delay_for(attempt) + Duration::from_millis(jitter);
                    warn!(
                        "Attempt {}/{} for {} failed: {} (retrying in {:?})",
                        attempt,
                        self.backoff.max_attempts,
                        url,
                        error_chain(&e),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff {
            max_attempts: 5,
            base: Duration::from_millis(500),
            max: Duration::from_secs(4),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let b = backoff();
        assert_eq!(b.delay_for(1), Duration::from_millis(500));
        assert_eq!(b.delay_for(2), Duration::from_millis(1000));
        assert_eq!(b.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let b = backoff();
        assert_eq!(b.delay_for(4), Duration::from_secs(4));
        assert_eq!(b.delay_for(40), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_from_config_needs_one_attempt() {
        let config = HttpConfig {
            max_attempts: 0,
            ..HttpConfig::default()
        };
        assert_eq!(Backoff::from(&config).max_attempts, 1);
    }

    #[test]
    fn test_client_rejects_invalid_cookie() {
        let result = JsonClient::new(&HttpConfig::default(), Some("session=bad\nvalue"));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_accepts_session_cookie() {
        assert!(JsonClient::new(&HttpConfig::default(), Some("session=abc;")).is_ok());
    }
}
