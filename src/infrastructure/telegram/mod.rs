//! Telegram Bot API client used as the human-escalation channel.
//!
//! This supervisor only ever sends, never polls for updates, so it talks
//! to the Bot API directly over `reqwest` instead of carrying a
//! polling-oriented bot framework for one-way notifications.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use governor::state::{InMemoryState, NotKeyed};
use governor::clock::DefaultClock;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::NotifierError;
use crate::domain::models::config::RetryConfig;
use crate::domain::ports::Notifier;

/// Telegram messages are capped at 4096 UTF-16 code units; split on this
/// many characters to stay well clear of the boundary.
const MAX_MESSAGE_CHARS: usize = 4000;

/// Sends escalation notifications to a single configured Telegram chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    retry: RetryConfig,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>, retry: RetryConfig) -> Self {
        // Telegram's own per-chat limit is roughly one message/second.
        let quota = Quota::per_second(NonZeroU32::new(1).unwrap());
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry,
        }
    }

    fn send_url(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }

    fn backoff(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.retry.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.retry.max_backoff_ms))
            .with_max_elapsed_time(Some(Duration::from_millis(self.retry.max_backoff_ms * u64::from(self.retry.max_retries))))
            .build()
    }

    async fn send_chunk(&self, text: &str) -> Result<(), NotifierError> {
        self.limiter.until_ready().await;

        let send = || async {
            let response = self
                .client
                .post(self.send_url())
                .json(&serde_json::json!({
                    "chat_id": self.chat_id,
                    "text": text,
                    "parse_mode": "HTML",
                }))
                .send()
                .await
                .map_err(|e| backoff::Error::transient(NotifierError::RequestFailed(e.to_string())))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = retry_after_seconds(response).await;
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                return Err(backoff::Error::transient(NotifierError::RateLimited(retry_after)));
            }

            if response.status().is_server_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::transient(NotifierError::ApiError(body)));
            }

            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(NotifierError::ApiError(body)));
            }

            Ok(())
        };

        backoff::future::retry(self.backoff(), send).await
    }
}

/// Telegram's 429 payload carries the wait time inside the JSON body
/// (`parameters.retry_after`), not just the `Retry-After` header; the
/// header is only a fallback for a malformed/empty body.
async fn retry_after_seconds(response: reqwest::Response) -> u64 {
    let header_fallback = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1);

    #[derive(serde::Deserialize)]
    struct RateLimitBody {
        parameters: Option<RateLimitParameters>,
    }
    #[derive(serde::Deserialize)]
    struct RateLimitParameters {
        retry_after: Option<u64>,
    }

    let Ok(body) = response.text().await else {
        return header_fallback;
    };
    serde_json::from_str::<RateLimitBody>(&body)
        .ok()
        .and_then(|b| b.parameters)
        .and_then(|p| p.retry_after)
        .unwrap_or(header_fallback)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifierError> {
        let escaped = html_escape(message);
        for chunk in chunk_message(&escaped, MAX_MESSAGE_CHARS) {
            self.send_chunk(&chunk).await?;
        }
        Ok(())
    }
}

/// No-op `Notifier` used when `telegram.bot_token`/`telegram.chat_id` are
/// not configured. Escalations still get written to the intervention log;
/// this just means nothing goes out over the wire.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _message: &str) -> Result<(), NotifierError> {
        Ok(())
    }
}

/// Escape the handful of characters Telegram's HTML parse mode treats
/// specially, so arbitrary log/diagnosis text can't break message
/// rendering.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Split `text` into chunks no longer than `max_chars`, breaking on line
/// boundaries where possible so a chunk boundary doesn't land mid-word.
fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
