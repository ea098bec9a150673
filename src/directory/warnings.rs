use anyhow::{Context, Result};

use super::DirectoryStore;

impl DirectoryStore {
    /// Add one warning for a user and return the new total.
    /// Insert and read happen under one lock, so concurrent callers see
    /// distinct counts.
    pub async fn add_warning(&self, user_id: u64) -> Result<u32> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO warnings (user_id, count) VALUES (?1, 1)
             ON CONFLICT(user_id) DO UPDATE SET count = count + 1",
            rusqlite::params![user_id as i64],
        )
        .with_context(|| format!("Failed to add warning for user {}", user_id))?;

        let count: i64 = conn
            .query_row(
                "SELECT count FROM warnings WHERE user_id = ?1",
                rusqlite::params![user_id as i64],
                |row| row.get(0),
            )
            .with_context(|| format!("Failed to read warnings for user {}", user_id))?;

        u32::try_from(count).context("Warning count out of range")
    }

    pub async fn clear_warnings(&self, user_id: u64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO warnings (user_id, count) VALUES (?1, 0)
             ON CONFLICT(user_id) DO UPDATE SET count = 0",
            rusqlite::params![user_id as i64],
        )
        .with_context(|| format!("Failed to reset warnings for user {}", user_id))?;
        Ok(())
    }
}
