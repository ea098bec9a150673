pub mod users;
pub mod warnings;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A handle -> identity record as last seen by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub username: String,
    pub user_id: u64,
    pub name: String,
}

/// The bot's handle -> identity cache plus per-user warning counters.
///
/// Never authoritative: entries found by handle must be re-checked against the
/// live platform before use.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Insert or refresh the entry for `entry.username`
    async fn upsert_user(&self, entry: &DirectoryEntry) -> Result<()>;

    async fn get_user(&self, username: &str) -> Result<Option<DirectoryEntry>>;

    // No command drives warnings yet; kept for an external ban policy
    /// Add one warning and return the new count
    #[cfg_attr(not(test), allow(dead_code))]
    async fn increment_warnings(&self, user_id: u64) -> Result<u32>;

    #[cfg_attr(not(test), allow(dead_code))]
    async fn reset_warnings(&self, user_id: u64) -> Result<()>;
}

/// SQLite-backed directory
#[derive(Clone)]
pub struct DirectoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl DirectoryStore {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Directory store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                id INTEGER NOT NULL,
                name TEXT NOT NULL,
                last_seen INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_id ON users(id);

            CREATE TABLE IF NOT EXISTS warnings (
                user_id INTEGER PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0)
            );
            ",
        )
        .context("Failed to run directory migrations")?;
        Ok(())
    }
}

#[async_trait]
impl Directory for DirectoryStore {
    async fn upsert_user(&self, entry: &DirectoryEntry) -> Result<()> {
        self.save_user(entry).await
    }

    async fn get_user(&self, username: &str) -> Result<Option<DirectoryEntry>> {
        self.find_user(username).await
    }

    async fn increment_warnings(&self, user_id: u64) -> Result<u32> {
        self.add_warning(user_id).await
    }

    async fn reset_warnings(&self, user_id: u64) -> Result<()> {
        self.clear_warnings(user_id).await
    }
}
