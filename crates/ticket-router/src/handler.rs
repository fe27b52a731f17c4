//! Executes classified ticket commands against the store.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use ticket_board::{reference_token, render_board, render_ticket, BoardWidth, MarkupMode};
use ticket_store::{TicketId, TicketStore, TicketStoreError};
use tracing::error;

use crate::command::{classify_ticket_command, DeleteMode, TicketCommand, TicketOperation};
use crate::pipeline::{InboundRequest, RequestHandler, TicketReply};

pub const STORAGE_FAILURE_MESSAGE: &str = "failed to process request, please try again later";

/// Errors surfaced by command execution. Each maps to a user-visible reply.
#[derive(Debug, Error)]
pub enum TicketCommandError {
    #[error("invalid ticket id '{token}' for {command}")]
    InvalidArgument { command: &'static str, token: String },
    #[error("ticket {id} does not exist")]
    NotFound { id: TicketId },
    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },
    #[error(transparent)]
    Storage(#[from] TicketStoreError),
}

impl TicketCommandError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument { command, token } if token.trim().is_empty() => {
                format!("missing ticket id: expected {command}<number>")
            }
            Self::InvalidArgument { command, token } => {
                format!("invalid ticket id '{token}': expected {command}<number>")
            }
            Self::NotFound { id } => {
                format!("ticket does not exist: {}", reference_token(*id))
            }
            Self::NotImplemented { .. } => "ticket updates are not implemented yet".to_string(),
            Self::Storage(_) => STORAGE_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Terminal handler of the request pipeline.
#[derive(Clone)]
pub struct TicketCommandHandler {
    store: Arc<dyn TicketStore>,
    markup: MarkupMode,
    delete_mode: DeleteMode,
}

impl TicketCommandHandler {
    pub fn new(store: Arc<dyn TicketStore>, markup: MarkupMode, delete_mode: DeleteMode) -> Self {
        Self {
            store,
            markup,
            delete_mode,
        }
    }

    /// Runs `command` and returns reply text in this handler's markup dialect.
    pub async fn execute(&self, command: TicketCommand) -> Result<String, TicketCommandError> {
        let markup = self.markup;
        match command {
            TicketCommand::Start => Ok(self.render_start()),
            TicketCommand::Board(width) => {
                let tickets = self.store.fetch_all().await?;
                Ok(render_board(&tickets, width, markup))
            }
            TicketCommand::Read { id } => {
                let ticket = self
                    .store
                    .fetch_by_id(id)
                    .await?
                    .ok_or(TicketCommandError::NotFound { id })?;
                Ok(render_ticket(&ticket, markup))
            }
            TicketCommand::Update { .. } => Err(TicketCommandError::NotImplemented {
                operation: TicketOperation::Update.as_str(),
            }),
            TicketCommand::Delete { ids } => {
                for id in &ids {
                    self.store.delete_by_id(*id).await?;
                }
                let references = ids
                    .iter()
                    .map(|id| markup.bold(&reference_token(*id)))
                    .collect::<Vec<_>>();
                let noun = if ids.len() == 1 { "ticket" } else { "tickets" };
                Ok(format!("deleted {noun} {}", references.join(" ")))
            }
            TicketCommand::Create { text } => {
                let id = self.store.insert(&text).await?;
                Ok(format!("created ticket {}", markup.bold(&reference_token(id))))
            }
            TicketCommand::Invalid { command, token } => {
                Err(TicketCommandError::InvalidArgument { command, token })
            }
        }
    }

    fn render_start(&self) -> String {
        let markup = self.markup;
        [
            markup.bold("ticket tracker ready"),
            markup.escape("send any text to create a ticket"),
            markup.escape("/board lists tickets, /wide_board lists them wider"),
            markup.escape("/r_<id> shows a ticket, /d_<id> deletes it"),
        ]
        .join("\n")
    }
}

#[async_trait]
impl RequestHandler for TicketCommandHandler {
    async fn handle(&self, request: &InboundRequest) -> TicketReply {
        let command =
            classify_ticket_command(&request.text, request.creation_text(), self.delete_mode);
        let operation = command.operation();
        match self.execute(command).await {
            Ok(text) => TicketReply::new(operation, text, self.markup),
            Err(error) => {
                if let TicketCommandError::Storage(source) = &error {
                    error!(
                        operation = operation.as_str(),
                        chat_id = %request.chat_id,
                        error = %source,
                        "ticket storage operation failed"
                    );
                }
                TicketReply::plain(operation, error.user_message())
            }
        }
    }
}

impl std::fmt::Debug for TicketCommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketCommandHandler")
            .field("markup", &self.markup)
            .field("delete_mode", &self.delete_mode)
            .finish_non_exhaustive()
    }
}

/// Renders the current board straight from a store, outside the chat flow.
pub async fn render_store_board(
    store: &dyn TicketStore,
    width: BoardWidth,
    markup: MarkupMode,
) -> Result<String, TicketCommandError> {
    let tickets = store.fetch_all().await?;
    Ok(render_board(&tickets, width, markup))
}
