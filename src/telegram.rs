//! Telegram bot notifications
//!
//! Enabled only when both BOT_TOKEN and CHAT_ID are set.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::source::Notifier;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone)]
struct BotTarget {
    token: String,
    chat_id: String,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    target: Option<BotTarget>,
}

impl TelegramNotifier {
    pub fn new(token: Option<String>, chat_id: Option<String>) -> Self {
        let target = match (token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(BotTarget { token, chat_id })
            }
            _ => None,
        };

        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, target }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    fn send_url(token: &str) -> String {
        format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        let Some(target) = &self.target else {
            debug!("Telegram disabled, not sending: {}", text);
            return;
        };

        let body = SendMessage {
            chat_id: &target.chat_id,
            text,
        };
        match self
            .client
            .post(Self::send_url(&target.token))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => debug!("Telegram notification sent"),
            Ok(resp) => warn!("Telegram notification rejected: {}", resp.status()),
            Err(e) => warn!("Telegram notification failed: {}", e.without_url()),
        }
    }
}
