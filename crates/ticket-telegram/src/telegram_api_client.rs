//! Bot API client used by the polling loop.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use ticket_board::MarkupMode;

use crate::telegram_retry::{body_excerpt, requested_retry_after, TelegramRetryPolicy};
use crate::telegram_types::{TelegramMessage, TelegramResponse, TelegramUpdate, TelegramUser};

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Extra headroom over the long-poll timeout before the HTTP client gives up.
const LONG_POLL_MARGIN: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry: TelegramRetryPolicy,
}

impl TelegramApiClient {
    pub fn new(
        api_base: &str,
        bot_token: &str,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let api_base = api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            bail!("telegram api base cannot be empty");
        }
        let bot_token = bot_token.trim().to_string();
        if bot_token.is_empty() {
            bail!("telegram bot token cannot be empty");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create telegram api client")?;
        Ok(Self {
            http,
            api_base,
            bot_token,
            retry: TelegramRetryPolicy::new(retry_max_attempts, retry_base_delay_ms),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    pub async fn get_me(&self) -> Result<TelegramUser> {
        let url = self.method_url("getMe");
        let response: TelegramResponse<TelegramUser> = self
            .request_json("getMe", || self.http.get(url.as_str()))
            .await?;
        unwrap_result("getMe", response)
    }

    /// Long-polls for updates at or after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_seconds: u64,
    ) -> Result<Vec<TelegramUpdate>> {
        let url = self.method_url("getUpdates");
        let payload = json!({
            "offset": offset,
            "timeout": timeout_seconds,
            "allowed_updates": ["message"],
        });
        let poll_timeout = Duration::from_secs(timeout_seconds).saturating_add(LONG_POLL_MARGIN);
        let response: TelegramResponse<Vec<TelegramUpdate>> = self
            .request_json("getUpdates", || {
                self.http
                    .post(url.as_str())
                    .timeout(poll_timeout)
                    .json(&payload)
            })
            .await?;
        unwrap_result("getUpdates", response)
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markup: MarkupMode,
    ) -> Result<TelegramMessage> {
        let url = self.method_url("sendMessage");
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if markup == MarkupMode::Html {
            payload["parse_mode"] = Value::String("HTML".to_string());
        }
        let response: TelegramResponse<TelegramMessage> = self
            .request_json("sendMessage", || self.http.post(url.as_str()).json(&payload))
            .await?;
        unwrap_result("sendMessage", response)
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<TelegramResponse<T>>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match builder().send().await {
                Ok(response) => {
                    let status = response.status();
                    let headers = response.headers().clone();
                    let body = response.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<TelegramResponse<T>>(&body)
                            .with_context(|| format!("failed to decode telegram {operation}"));
                    }

                    let retry_after = requested_retry_after(&headers, &body);
                    if let Some(delay) = self.retry.after_status(attempt, status, retry_after) {
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    bail!(
                        "telegram api {operation} failed with status {}: {}",
                        status.as_u16(),
                        body_excerpt(&body)
                    );
                }
                Err(error) => {
                    // The request URL embeds the bot token.
                    let error = error.without_url();
                    if let Some(delay) = self.retry.after_transport_error(attempt, &error) {
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("telegram api {operation} request failed"));
                }
            }
        }
    }
}

impl std::fmt::Debug for TelegramApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApiClient")
            .field("api_base", &self.api_base)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn unwrap_result<T>(operation: &str, response: TelegramResponse<T>) -> Result<T> {
    if !response.ok {
        bail!(
            "telegram {operation} failed: {}",
            response
                .description
                .unwrap_or_else(|| "unknown error".to_string())
        );
    }
    response
        .result
        .ok_or_else(|| anyhow!("telegram {operation} response missing result"))
}
