//! Runtime configuration and pipeline assembly.

use std::sync::Arc;

use anyhow::{bail, Result};
use ticket_board::MarkupMode;
use ticket_store::TicketStore;

use crate::command::DeleteMode;
use crate::gate::{AuthorizationGate, OperatorGate};
use crate::handler::TicketCommandHandler;
use crate::pipeline::{compose_pipeline, Middleware, RequestHandler};
use crate::request_logger::RequestLogger;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Read-only settings injected into the request pipeline at startup.
pub struct TicketBotConfig {
    pub operator_id: String,
    pub markup: MarkupMode,
    pub delete_mode: DeleteMode,
}

impl TicketBotConfig {
    pub fn new(operator_id: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into(),
            markup: MarkupMode::default(),
            delete_mode: DeleteMode::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let operator_id = self.operator_id.trim();
        if operator_id.is_empty() {
            bail!("operator id cannot be empty");
        }
        if operator_id.chars().any(char::is_whitespace) {
            bail!("operator id '{operator_id}' must not contain whitespace");
        }
        Ok(())
    }
}

/// Middleware in execution order: logger outermost, gate right before the
/// command handler.
pub fn ticket_middlewares(config: &TicketBotConfig) -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(RequestLogger),
        Arc::new(AuthorizationGate::new(OperatorGate::new(
            config.operator_id.as_str(),
        ))),
    ]
}

pub fn build_ticket_pipeline(
    config: &TicketBotConfig,
    store: Arc<dyn TicketStore>,
) -> Arc<dyn RequestHandler> {
    let terminal = Arc::new(TicketCommandHandler::new(
        store,
        config.markup,
        config.delete_mode,
    ));
    compose_pipeline(&ticket_middlewares(config), terminal)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ticket_board::MarkupMode;
    use ticket_store::{InMemoryTicketStore, TicketStore};

    use super::{build_ticket_pipeline, ticket_middlewares, TicketBotConfig};
    use crate::command::TicketOperation;
    use crate::gate::UNAUTHORIZED_PLACEHOLDER;
    use crate::pipeline::InboundRequest;

    #[test]
    fn unit_validate_rejects_blank_or_spaced_operator_ids() {
        assert!(TicketBotConfig::new("1001").validate().is_ok());
        let error = TicketBotConfig::new("  ").validate().expect_err("blank id");
        assert!(error.to_string().contains("cannot be empty"));
        assert!(TicketBotConfig::new("10 01").validate().is_err());
    }

    #[test]
    fn unit_middleware_order_is_logger_then_gate() {
        let names = ticket_middlewares(&TicketBotConfig::new("1001"))
            .iter()
            .map(|middleware| middleware.name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["request_logger", "authorization_gate"]);
    }

    #[tokio::test]
    async fn integration_unauthorized_sender_never_reaches_the_store() {
        let store = Arc::new(InMemoryTicketStore::new());
        store.insert("existing").await.expect("insert");
        let mut config = TicketBotConfig::new("1001");
        config.markup = MarkupMode::Plain;
        let pipeline = build_ticket_pipeline(&config, Arc::clone(&store) as _);

        for text in ["sneaky ticket", "/d_1", "/board", "/r_1", "/start", "/u_1"] {
            let reply = pipeline
                .handle(&InboundRequest::new("666", "666", text))
                .await;
            assert_eq!(reply.operation, TicketOperation::Unauthorized);
            assert_eq!(reply.text, UNAUTHORIZED_PLACEHOLDER);
        }

        let tickets = store.fetch_all().await.expect("fetch all");
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].text, "existing");
    }

    #[tokio::test]
    async fn integration_operator_scenario_create_read_delete() {
        let store = Arc::new(InMemoryTicketStore::new());
        let mut config = TicketBotConfig::new("1001");
        config.markup = MarkupMode::Plain;
        let pipeline = build_ticket_pipeline(&config, Arc::clone(&store) as _);
        let send = |text: &str| InboundRequest::new("1001", "1001", text);

        let created = pipeline.handle(&send("Buy milk")).await;
        assert!(created.text.contains("[/r_1]"));
        let read = pipeline.handle(&send("/r_1")).await;
        assert!(read.text.contains("Buy milk"));
        let deleted = pipeline.handle(&send("/d_1")).await;
        assert_eq!(deleted.operation, TicketOperation::Delete);
        let gone = pipeline.handle(&send("/r_1")).await;
        assert!(gone.text.contains("ticket does not exist"));
    }
}
