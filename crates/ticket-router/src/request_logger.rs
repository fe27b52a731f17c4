//! Structured before/after logging around every request.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::pipeline::{InboundRequest, Middleware, RequestHandler, TicketReply};

/// Outermost middleware; observes every request, denied ones included.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    fn wrap(&self, next: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler> {
        Arc::new(LoggedHandler { next })
    }
}

struct LoggedHandler {
    next: Arc<dyn RequestHandler>,
}

#[async_trait]
impl RequestHandler for LoggedHandler {
    async fn handle(&self, request: &InboundRequest) -> TicketReply {
        let started = Instant::now();
        info!(
            sender_id = %request.sender_id,
            sender_display = %request.sender_display,
            chat_id = %request.chat_id,
            text = %request.text,
            "ticket request started"
        );
        let reply = self.next.handle(request).await;
        info!(
            sender_id = %request.sender_id,
            operation = reply.operation.as_str(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "ticket request completed"
        );
        reply
    }
}
