use rusqlite::{Connection, OptionalExtension};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

mod conversations;
mod documents;
mod persons;
mod schema;

pub use conversations::conversations_query;
pub use documents::{Direction, Document, Query, Snapshot, Subscription, WriteBatch};
pub use schema::SCHEMA_VERSION;

use crate::error::StoreError;
use documents::Listeners;

/// Collection holding `Person` documents.
pub const PEOPLE: &str = "people";
/// Collection holding `Conversation` documents.
pub const CONVERSATIONS: &str = "conversations";

const ENV_DATA_DIR: &str = "OUTREACH_DATA_DIR";

/// Document store backed by SQLite.
///
/// Collections hold JSON documents keyed by store-assigned ids. Queries can be
/// subscribed to; subscribers receive a fresh snapshot after every write to the
/// collection they watch. Single-threaded by construction.
pub struct Database {
    conn: Connection,
    listeners: Rc<RefCell<Listeners>>,
}

impl Database {
    /// Open database, creating if needed, running migrations
    pub fn open() -> Result<Self, StoreError> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        debug!(path = %path.display(), "opened document store");
        Self::with_connection(conn)
    }

    /// Open in-memory database for testing
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let db = Self {
            conn,
            listeners: Rc::new(RefCell::new(Listeners::default())),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Root directory for the database and uploaded photos.
    pub fn data_dir() -> Result<PathBuf, StoreError> {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        let config_dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(config_dir.join("outreachmap"))
    }

    fn default_path() -> Result<PathBuf, StoreError> {
        Ok(Self::data_dir()?.join("outreach.db"))
    }

    /// Object-store root for uploaded profile images.
    pub fn photos_dir() -> Result<PathBuf, StoreError> {
        let dir = Self::data_dir()?.join("photos");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let version = self.get_schema_version()?;

        if version < 1 {
            self.conn
                .execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", schema::SCHEMA_V1))?;
            self.set_schema_version(1)?;
        }
        if version < 2 {
            self.conn.execute_batch(schema::MIGRATION_V2)?;
            self.set_schema_version(2)?;
        }
        if version < SCHEMA_VERSION {
            info!(from = version, to = SCHEMA_VERSION, "migrated schema");
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Result<i32, StoreError> {
        let has_table: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        if has_table == 0 {
            return Ok(0);
        }

        let version = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(version.unwrap_or(0))
    }

    fn set_schema_version(&self, version: i32) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
            [version],
        )?;
        Ok(())
    }

    // ==================== SETTINGS ====================

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool, StoreError> {
        let rows = self
            .conn
            .execute("DELETE FROM app_settings WHERE key = ?", [key])?;
        Ok(rows > 0)
    }
}
