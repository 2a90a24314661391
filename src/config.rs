//! Configuration management
//!
//! Tunables come from config.toml (embedded default, overridable by a file
//! on disk). Session cookies and notification credentials come from the
//! environment, optionally loaded from a `.env` file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scoring::ScoringParams;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default = "PlatformConfig::sherlock")]
    pub sherlock: PlatformConfig,
    #[serde(default = "PlatformConfig::code4rena")]
    pub code4rena: PlatformConfig,
}

/// Request timeout and per-request retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base_ms: 500,
            backoff_max_ms: 8000,
            request_timeout_secs: 30,
        }
    }
}

/// Refresh loop policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Consecutive failed cycles before the loop gives up
    pub max_retries: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { max_retries: 5 }
    }
}

/// Endpoint and scoring constants of one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub base_url: String,
    pub high_base: f64,
    pub medium_base: f64,
    pub decay: f64,
    /// Wait after a failed cycle when no poll interval is given
    pub fallback_retry_delay_secs: u64,
}

impl PlatformConfig {
    pub fn sherlock() -> Self {
        let scoring = ScoringParams::sherlock();
        Self {
            base_url: "https://audits.sherlock.xyz/api".to_string(),
            high_base: scoring.high_base,
            medium_base: scoring.medium_base,
            decay: scoring.decay,
            fallback_retry_delay_secs: 5,
        }
    }

    pub fn code4rena() -> Self {
        let scoring = ScoringParams::code4rena();
        Self {
            base_url: "https://code4rena.com/api/v1".to_string(),
            high_base: scoring.high_base,
            medium_base: scoring.medium_base,
            decay: scoring.decay,
            fallback_retry_delay_secs: 600,
        }
    }

    pub fn scoring(&self) -> ScoringParams {
        ScoringParams {
            high_base: self.high_base,
            medium_base: self.medium_base,
            decay: self.decay,
        }
    }

    /// Poll interval when positive, the platform fallback otherwise
    pub fn retry_delay(&self, timeout: Option<Duration>) -> Duration {
        match timeout {
            Some(t) if !t.is_zero() => t,
            _ => Duration::from_secs(self.fallback_retry_delay_secs),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "{}.decay must be in (0, 1], got {}",
                name, self.decay
            )));
        }
        if self.high_base < 0.0 || self.medium_base < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{} base points must not be negative",
                name
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{}.base_url is empty", name)));
        }
        Ok(())
    }
}

impl Config {
    /// Load from config.toml or use defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.toml")
    }

    /// Load from specific path, falling back to the embedded defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let config: Config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&content)?
        } else {
            toml::from_str(DEFAULT_CONFIG)?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "monitor.max_retries must be at least 1".to_string(),
            ));
        }
        self.sherlock.validate("sherlock")?;
        self.code4rena.validate("code4rena")
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded config ships with the crate; fall back to code defaults regardless.
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            http: HttpConfig::default(),
            monitor: MonitorConfig::default(),
            sherlock: PlatformConfig::sherlock(),
            code4rena: PlatformConfig::code4rena(),
        })
    }
}

/// Secrets and identity read from the environment
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub session_sherlock: Option<String>,
    pub session_code4: Option<String>,
    pub code4rena_handle: Option<String>,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    /// Crash reporting is off without it
    pub sentry_dsn: Option<String>,
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Environment {
    /// Reads `.env` (when present) and then the process environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_process_env()
    }

    pub fn from_process_env() -> Self {
        Self {
            session_sherlock: non_empty_var("SESSION_SHERLOCK"),
            session_code4: non_empty_var("SESSION_CODE4"),
            code4rena_handle: non_empty_var("CODE4RENA_HANDLE"),
            bot_token: non_empty_var("BOT_TOKEN"),
            chat_id: non_empty_var("CHAT_ID"),
            sentry_dsn: non_empty_var("SENTRY_DSN"),
        }
    }

    pub fn sherlock_session(&self) -> Result<&str, ConfigError> {
        self.session_sherlock
            .as_deref()
            .ok_or(ConfigError::MissingVar("SESSION_SHERLOCK"))
    }

    pub fn code4rena_session(&self) -> Result<&str, ConfigError> {
        self.session_code4
            .as_deref()
            .ok_or(ConfigError::MissingVar("SESSION_CODE4"))
    }
}
