//! SQLite-backed `TicketStore` implementation with durable persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::{StoreResult, Ticket, TicketId, TicketStore, TicketStoreError};

/// Schema of the single ticket table.
pub const TICKETS_TABLE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        text TEXT
    );
"#;

const LEGACY_BACKLOG_TABLE: &str = "backlog";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Outcome of copying the legacy `backlog` table into `tickets`.
pub struct MigrationReport {
    pub source_table_present: bool,
    pub copied: usize,
    pub skipped: usize,
}

/// Persistent SQLite store backend.
///
/// Holds only the database path; each operation opens and closes its own
/// connection.
#[derive(Debug, Clone)]
pub struct SqliteTicketStore {
    db_path: PathBuf,
}

impl SqliteTicketStore {
    /// Creates a SQLite-backed store at `path`, creating schema if needed.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    fn open_connection(&self) -> rusqlite::Result<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(connection)
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        let connection = self
            .open_connection()
            .map_err(TicketStoreError::Unavailable)?;
        connection
            .execute_batch(TICKETS_TABLE_SCHEMA)
            .map_err(TicketStoreError::Unavailable)?;
        debug!(db_path = %self.db_path.display(), "ticket schema ready");
        Ok(())
    }

    /// Copies rows from the legacy `backlog(id, text)` table into `tickets`,
    /// keeping their ids. Rows whose id is already taken are skipped.
    ///
    /// Legacy rows hold raw text; `to_stored_text` converts each one into the
    /// markup dialect the bot stores tickets in.
    pub fn migrate_legacy_backlog<F>(&self, to_stored_text: F) -> StoreResult<MigrationReport>
    where
        F: Fn(&str) -> String,
    {
        let mut connection = self.open_connection().map_err(TicketStoreError::Write)?;
        connection
            .execute_batch(TICKETS_TABLE_SCHEMA)
            .map_err(TicketStoreError::Write)?;
        let transaction = connection.transaction().map_err(TicketStoreError::Write)?;

        let source_table_present = transaction
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![LEGACY_BACKLOG_TABLE],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(TicketStoreError::Read)?
            .is_some();
        if !source_table_present {
            return Ok(MigrationReport::default());
        }

        let rows = {
            let mut statement = transaction
                .prepare("SELECT id, text FROM backlog ORDER BY id")
                .map_err(TicketStoreError::Read)?;
            let rows = statement
                .query_map([], |row| {
                    Ok((row.get::<_, TicketId>(0)?, row.get::<_, Option<String>>(1)?))
                })
                .map_err(TicketStoreError::Read)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(TicketStoreError::Read)?;
            rows
        };

        let mut report = MigrationReport {
            source_table_present,
            ..MigrationReport::default()
        };
        for (id, text) in rows {
            let text = text.map(|text| to_stored_text(&text));
            let changed = transaction
                .execute(
                    "INSERT OR IGNORE INTO tickets (id, text) VALUES (?1, ?2)",
                    params![id, text],
                )
                .map_err(TicketStoreError::Write)?;
            if changed == 0 {
                report.skipped = report.skipped.saturating_add(1);
            } else {
                report.copied = report.copied.saturating_add(1);
            }
        }
        transaction.commit().map_err(TicketStoreError::Write)?;

        info!(
            copied = report.copied,
            skipped = report.skipped,
            "legacy backlog migrated into tickets"
        );
        Ok(report)
    }
}

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        self.initialize_schema()
    }

    async fn insert(&self, text: &str) -> StoreResult<TicketId> {
        let connection = self.open_connection().map_err(TicketStoreError::Write)?;
        connection
            .execute("INSERT INTO tickets (text) VALUES (?1)", params![text])
            .map_err(TicketStoreError::Write)?;
        Ok(connection.last_insert_rowid())
    }

    async fn fetch_by_id(&self, id: TicketId) -> StoreResult<Option<Ticket>> {
        let connection = self.open_connection().map_err(TicketStoreError::Read)?;
        let text = connection
            .query_row(
                "SELECT text FROM tickets WHERE id = ?1",
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(TicketStoreError::Read)?;
        Ok(text.map(|text| Ticket::persisted(id, text.unwrap_or_default())))
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Ticket>> {
        let connection = self.open_connection().map_err(TicketStoreError::Read)?;
        let mut statement = connection
            .prepare("SELECT id, text FROM tickets ORDER BY id")
            .map_err(TicketStoreError::Read)?;
        let tickets = statement
            .query_map([], |row| {
                Ok(Ticket::persisted(
                    row.get::<_, TicketId>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            })
            .map_err(TicketStoreError::Read)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(TicketStoreError::Read)?;
        Ok(tickets)
    }

    async fn delete_by_id(&self, id: TicketId) -> StoreResult<()> {
        let connection = self.open_connection().map_err(TicketStoreError::Write)?;
        connection
            .execute("DELETE FROM tickets WHERE id = ?1", params![id])
            .map_err(TicketStoreError::Write)?;
        Ok(())
    }
}
