//! Ticket persistence model and store backends.
//!
//! Tickets are owned by a [`TicketStore`]; callers only ever receive owned
//! snapshots. Identifiers are assigned by the store, strictly increase over the
//! lifetime of the table, and are never reused after deletion.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

mod sqlite;

pub use sqlite::{MigrationReport, SqliteTicketStore, TICKETS_TABLE_SCHEMA};

/// Store-assigned ticket identifier.
pub type TicketId = i64;

/// Result type for ticket store operations.
pub type StoreResult<T> = Result<T, TicketStoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum TicketStoreError {
    #[error("ticket storage unavailable: {0}")]
    Unavailable(#[source] rusqlite::Error),
    #[error("ticket storage write failed: {0}")]
    Write(#[source] rusqlite::Error),
    #[error("ticket storage read failed: {0}")]
    Read(#[source] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single unit of work tracked by the bot.
pub struct Ticket {
    /// `None` only for a draft that has not been persisted yet.
    pub id: Option<TicketId>,
    pub text: String,
}

impl Ticket {
    /// Builds an unpersisted ticket.
    pub fn draft(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
        }
    }

    pub fn persisted(id: TicketId, text: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            text: text.into(),
        }
    }

    /// First line of the ticket text, used as the summary title.
    pub fn title(&self) -> &str {
        self.text.lines().next().unwrap_or_default()
    }
}

/// Async store contract used by the command handler.
///
/// Every operation is independently atomic and acquires its own storage scope;
/// no lock or connection is held between calls.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Creates the ticket table when absent. Safe to call on every start.
    async fn ensure_schema(&self) -> StoreResult<()>;
    /// Persists `text` as a new ticket and returns the assigned id.
    async fn insert(&self, text: &str) -> StoreResult<TicketId>;
    async fn fetch_by_id(&self, id: TicketId) -> StoreResult<Option<Ticket>>;
    /// Returns every ticket in insertion order.
    async fn fetch_all(&self) -> StoreResult<Vec<Ticket>>;
    /// Removes the ticket when present. Unknown ids are not an error.
    async fn delete_by_id(&self, id: TicketId) -> StoreResult<()>;
}

/// In-memory implementation for tests and local experimentation.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    inner: RwLock<InMemoryTickets>,
}

#[derive(Debug, Default)]
struct InMemoryTickets {
    last_id: TicketId,
    tickets: BTreeMap<TicketId, String>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert(&self, text: &str) -> StoreResult<TicketId> {
        let mut inner = self.inner.write().await;
        inner.last_id = inner.last_id.saturating_add(1);
        let id = inner.last_id;
        inner.tickets.insert(id, text.to_string());
        Ok(id)
    }

    async fn fetch_by_id(&self, id: TicketId) -> StoreResult<Option<Ticket>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tickets
            .get(&id)
            .map(|text| Ticket::persisted(id, text.as_str())))
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Ticket>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tickets
            .iter()
            .map(|(id, text)| Ticket::persisted(*id, text.as_str()))
            .collect())
    }

    async fn delete_by_id(&self, id: TicketId) -> StoreResult<()> {
        self.inner.write().await.tickets.remove(&id);
        Ok(())
    }
}
