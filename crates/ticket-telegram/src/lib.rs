//! Telegram Bot API transport for the ticket bot.
//!
//! Long-polls `getUpdates`, turns each text message into an
//! [`ticket_router::InboundRequest`], runs it through the request pipeline and
//! posts the reply with `sendMessage`.

pub mod telegram_api_client;
pub mod telegram_markup;
mod telegram_reply_chunks;
mod telegram_retry;
pub mod telegram_runtime;
pub mod telegram_types;

pub use telegram_api_client::*;
pub use telegram_markup::*;
pub use telegram_reply_chunks::{split_reply_chunks, TELEGRAM_SAFE_MAX_CHARS};
pub use telegram_runtime::*;
pub use telegram_types::*;
