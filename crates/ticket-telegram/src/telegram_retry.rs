//! When and how long to wait before repeating a Bot API call.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

use crate::telegram_types::TelegramResponse;

/// Longest server-requested pause honored before giving up on a call.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TelegramRetryPolicy {
    max_attempts: usize,
    base_delay_ms: u64,
}

impl TelegramRetryPolicy {
    pub(crate) fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
        }
    }

    /// Pause before repeating a call that got `status`, or `None` when the
    /// call must fail now. Throttling and server errors are retried.
    pub(crate) fn after_status(
        &self,
        attempt: usize,
        status: StatusCode,
        retry_after: Option<Duration>,
    ) -> Option<Duration> {
        let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        if !retryable || attempt >= self.max_attempts {
            return None;
        }
        match retry_after {
            Some(requested) if requested > MAX_RETRY_AFTER => None,
            Some(requested) => Some(requested),
            None => Some(self.backoff(attempt)),
        }
    }

    /// Pause before repeating a call that never got a response.
    pub(crate) fn after_transport_error(
        &self,
        attempt: usize,
        error: &reqwest::Error,
    ) -> Option<Duration> {
        let retryable = error.is_timeout() || error.is_connect() || error.is_request();
        (retryable && attempt < self.max_attempts).then(|| self.backoff(attempt))
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let doublings = u32::try_from(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX)
            .min(MAX_BACKOFF_DOUBLINGS);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1_u64 << doublings))
    }
}

/// Server-requested pause: the `Retry-After` header, else the
/// `parameters.retry_after` field Telegram puts in 429 bodies.
pub(crate) fn requested_retry_after(headers: &HeaderMap, body: &str) -> Option<Duration> {
    let header_seconds = headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    header_seconds
        .or_else(|| {
            serde_json::from_str::<TelegramResponse<serde_json::Value>>(body)
                .ok()?
                .parameters?
                .retry_after
        })
        .map(Duration::from_secs)
}

/// Bounded excerpt of an error body for log and error messages.
pub(crate) fn body_excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 800;
    match body.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
