//! Single-operator authorization gate.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::command::TicketOperation;
use crate::pipeline::{InboundRequest, Middleware, RequestHandler, TicketReply};

/// Neutral reply sent to anyone who is not the operator.
pub const UNAUTHORIZED_PLACEHOLDER: &str = "¯\\_(ツ)_/¯";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorGate {
    operator_id: String,
}

impl OperatorGate {
    pub fn new(operator_id: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into().trim().to_string(),
        }
    }

    pub fn operator_id(&self) -> &str {
        self.operator_id.as_str()
    }

    /// True iff `sender_id` is the configured operator. An empty operator id
    /// authorizes nobody.
    pub fn is_authorized(&self, sender_id: &str) -> bool {
        !self.operator_id.is_empty() && sender_id.trim() == self.operator_id
    }
}

/// Middleware that short-circuits every request from a non-operator.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    gate: OperatorGate,
}

impl AuthorizationGate {
    pub fn new(gate: OperatorGate) -> Self {
        Self { gate }
    }
}

impl Middleware for AuthorizationGate {
    fn name(&self) -> &'static str {
        "authorization_gate"
    }

    fn wrap(&self, next: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler> {
        Arc::new(GatedHandler {
            gate: self.gate.clone(),
            next,
        })
    }
}

struct GatedHandler {
    gate: OperatorGate,
    next: Arc<dyn RequestHandler>,
}

#[async_trait]
impl RequestHandler for GatedHandler {
    async fn handle(&self, request: &InboundRequest) -> TicketReply {
        if !self.gate.is_authorized(&request.sender_id) {
            warn!(
                sender_id = %request.sender_id,
                chat_id = %request.chat_id,
                "denied ticket request from unauthorized sender"
            );
            return TicketReply::plain(TicketOperation::Unauthorized, UNAUTHORIZED_PLACEHOLDER);
        }
        self.next.handle(request).await
    }
}
