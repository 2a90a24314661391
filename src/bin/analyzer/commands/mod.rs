//! Subcommand implementations

pub mod code4rena;
pub mod sherlock;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use contest_analyzer::config::PlatformConfig;
use contest_analyzer::{Config, Environment, RetryPolicy, TelegramNotifier};

use crate::style::*;

/// Loads `--config` when given, `./config.toml` or the built-in defaults otherwise
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            Config::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Config::load().context("Failed to load config.toml"),
    }
}

/// `--timeout` seconds; zero or absent means run once
pub fn poll_interval(timeout: Option<u64>) -> Option<Duration> {
    timeout.filter(|t| *t > 0).map(Duration::from_secs)
}

pub fn retry_policy(config: &Config, platform: &PlatformConfig, interval: Option<Duration>) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.monitor.max_retries,
        retry_delay: platform.retry_delay(interval),
    }
}

pub fn telegram(env: &Environment) -> TelegramNotifier {
    let notifier = TelegramNotifier::new(env.bot_token.clone(), env.chat_id.clone());
    if !notifier.is_enabled() {
        print_warning("BOT_TOKEN or CHAT_ID not set, Telegram notifications disabled");
    }
    notifier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval() {
        assert_eq!(poll_interval(None), None);
        assert_eq!(poll_interval(Some(0)), None);
        assert_eq!(poll_interval(Some(30)), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_retry_policy_falls_back_per_platform() {
        let config = Config::default();
        let policy = retry_policy(&config, &config.code4rena, None);
        assert_eq!(policy.retry_delay, Duration::from_secs(600));
        assert_eq!(policy.max_retries, 5);

        let policy = retry_policy(&config, &config.sherlock, Some(Duration::from_secs(60)));
        assert_eq!(policy.retry_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/contest-analyzer.toml"))).is_err());
    }
}
