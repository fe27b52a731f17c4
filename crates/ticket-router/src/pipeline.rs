//! Request/reply types and the middleware chain around the command handler.

use std::sync::Arc;

use async_trait::async_trait;
use ticket_board::MarkupMode;

use crate::command::TicketOperation;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One inbound chat message, already resolved by the transport.
pub struct InboundRequest {
    pub sender_id: String,
    pub sender_display: String,
    pub chat_id: String,
    pub text: String,
    /// Text in the transport's markup dialect, when it could be reconstructed.
    pub markup_text: Option<String>,
}

impl InboundRequest {
    pub fn new(
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_display: String::new(),
            chat_id: chat_id.into(),
            text: text.into(),
            markup_text: None,
        }
    }

    pub fn with_sender_display(mut self, sender_display: impl Into<String>) -> Self {
        self.sender_display = sender_display.into();
        self
    }

    pub fn with_markup_text(mut self, markup_text: impl Into<String>) -> Self {
        self.markup_text = Some(markup_text.into());
        self
    }

    /// Text stored when the message creates a ticket.
    pub fn creation_text(&self) -> &str {
        self.markup_text.as_deref().unwrap_or(self.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketReply {
    pub operation: TicketOperation,
    pub text: String,
    pub markup: MarkupMode,
}

impl TicketReply {
    pub fn new(operation: TicketOperation, text: impl Into<String>, markup: MarkupMode) -> Self {
        Self {
            operation,
            text: text.into(),
            markup,
        }
    }

    pub fn plain(operation: TicketOperation, text: impl Into<String>) -> Self {
        Self::new(operation, text, MarkupMode::Plain)
    }
}

/// Handles one request end to end. Failures are already converted into reply
/// text by the time a reply is returned.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: &InboundRequest) -> TicketReply;
}

/// Wraps a handler with a cross-cutting concern.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;
    fn wrap(&self, next: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler>;
}

/// Composes `middlewares` around `terminal`; the first entry is outermost.
pub fn compose_pipeline(
    middlewares: &[Arc<dyn Middleware>],
    terminal: Arc<dyn RequestHandler>,
) -> Arc<dyn RequestHandler> {
    middlewares
        .iter()
        .rev()
        .fold(terminal, |next, middleware| middleware.wrap(next))
}
