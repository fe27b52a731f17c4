//! Long-poll loop that feeds Telegram messages through the request pipeline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ticket_board::MarkupMode;
use ticket_router::{InboundRequest, RequestHandler};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::telegram_api_client::{TelegramApiClient, DEFAULT_TELEGRAM_API_BASE};
use crate::telegram_markup::message_to_request;
use crate::telegram_reply_chunks::{split_reply_chunks, TELEGRAM_SAFE_MAX_CHARS};
use crate::telegram_types::TelegramUpdate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramBotConfig {
    pub api_base: String,
    pub bot_token: String,
    pub poll_timeout_seconds: u64,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    /// Pause after a failed `getUpdates` before polling again.
    pub error_backoff_ms: u64,
    pub markup: MarkupMode,
}

impl TelegramBotConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            poll_timeout_seconds: 30,
            request_timeout_ms: 15_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            error_backoff_ms: 1_000,
            markup: MarkupMode::default(),
        }
    }

    pub fn api_client(&self) -> Result<TelegramApiClient> {
        TelegramApiClient::new(
            &self.api_base,
            &self.bot_token,
            self.request_timeout_ms,
            self.retry_max_attempts,
            self.retry_base_delay_ms,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelegramRunSummary {
    pub poll_cycles: u64,
    pub poll_failures: u64,
    pub updates_seen: u64,
    pub messages_handled: u64,
    pub replies_failed: u64,
}

/// Polls until `shutdown` resolves, then waits for in-flight messages.
pub async fn run_telegram_bot<S>(
    config: &TelegramBotConfig,
    pipeline: Arc<dyn RequestHandler>,
    shutdown: S,
) -> Result<TelegramRunSummary>
where
    S: Future<Output = ()>,
{
    let client = config.api_client()?;
    let me = client
        .get_me()
        .await
        .context("failed to verify telegram bot token")?;
    info!(
        bot_id = me.id,
        bot_username = me.username.as_deref().unwrap_or_default(),
        markup = config.markup.as_str(),
        "telegram bot connected"
    );

    let mut summary = TelegramRunSummary::default();
    let mut offset = 0_i64;
    let mut in_flight: JoinSet<bool> = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        let polled = tokio::select! {
            _ = &mut shutdown => {
                info!("telegram bot shutdown requested");
                break;
            }
            polled = client.get_updates(offset, config.poll_timeout_seconds) => polled,
        };
        summary.poll_cycles = summary.poll_cycles.saturating_add(1);

        match polled {
            Ok(updates) => {
                offset = next_update_offset(offset, &updates);
                summary.updates_seen = summary.updates_seen.saturating_add(updates.len() as u64);
                for update in updates {
                    let Some(request) = update_to_request(&update, config.markup) else {
                        debug!(update_id = update.update_id, "skipping non-text telegram update");
                        continue;
                    };
                    let client = client.clone();
                    let pipeline = Arc::clone(&pipeline);
                    in_flight.spawn(async move { deliver(&client, pipeline.as_ref(), request).await });
                }
            }
            Err(error) => {
                summary.poll_failures = summary.poll_failures.saturating_add(1);
                warn!(error = %format!("{error:#}"), "telegram getUpdates failed");
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(Duration::from_millis(config.error_backoff_ms)) => {}
                }
            }
        }

        while let Some(finished) = in_flight.try_join_next() {
            record_delivery(&mut summary, finished);
        }
    }

    while let Some(finished) = in_flight.join_next().await {
        record_delivery(&mut summary, finished);
    }
    info!(
        poll_cycles = summary.poll_cycles,
        updates_seen = summary.updates_seen,
        messages_handled = summary.messages_handled,
        replies_failed = summary.replies_failed,
        "telegram bot stopped"
    );
    Ok(summary)
}

fn record_delivery(
    summary: &mut TelegramRunSummary,
    finished: Result<bool, tokio::task::JoinError>,
) {
    summary.messages_handled = summary.messages_handled.saturating_add(1);
    match finished {
        Ok(true) => {}
        Ok(false) => summary.replies_failed = summary.replies_failed.saturating_add(1),
        Err(error) => {
            summary.replies_failed = summary.replies_failed.saturating_add(1);
            warn!(error = %error, "telegram message task aborted");
        }
    }
}

/// Offset acknowledging every update in `updates`, never moving backwards.
pub fn next_update_offset(current: i64, updates: &[TelegramUpdate]) -> i64 {
    updates
        .iter()
        .map(|update| update.update_id.saturating_add(1))
        .fold(current, i64::max)
}

fn update_to_request(update: &TelegramUpdate, markup: MarkupMode) -> Option<InboundRequest> {
    message_to_request(update.message.as_ref()?, markup)
}

/// Runs one request through the pipeline and sends the reply. Returns whether
/// every chunk was delivered.
async fn deliver(
    client: &TelegramApiClient,
    pipeline: &dyn RequestHandler,
    request: InboundRequest,
) -> bool {
    let reply = pipeline.handle(&request).await;
    for chunk in split_reply_chunks(&reply.text, reply.markup, TELEGRAM_SAFE_MAX_CHARS) {
        if let Err(error) = client
            .send_message(&request.chat_id, &chunk, reply.markup)
            .await
        {
            warn!(
                chat_id = %request.chat_id,
                operation = reply.operation.as_str(),
                error = %format!("{error:#}"),
                "failed to send telegram reply"
            );
            return false;
        }
    }
    true
}
