use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use super::{DirectoryEntry, DirectoryStore};

impl DirectoryStore {
    /// Store or refresh a user, stamping it with the current time
    pub async fn save_user(&self, entry: &DirectoryEntry) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (username, id, name, last_seen)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(username) DO UPDATE SET
                id = excluded.id,
                name = excluded.name,
                last_seen = excluded.last_seen",
            rusqlite::params![&entry.username, entry.user_id as i64, &entry.name, now],
        )
        .with_context(|| format!("Failed to save user {}", entry.username))?;
        Ok(())
    }

    /// Look up a user by handle
    pub async fn find_user(&self, username: &str) -> Result<Option<DirectoryEntry>> {
        let conn = self.conn.lock().await;
        let entry = conn
            .query_row(
                "SELECT username, id, name FROM users WHERE username = ?1",
                rusqlite::params![username],
                |row| {
                    let id: i64 = row.get(1)?;
                    Ok(DirectoryEntry {
                        username: row.get(0)?,
                        user_id: id as u64,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("Failed to look up user {}", username))?;
        Ok(entry)
    }

    /// Unix timestamp of the last upsert for a handle
    #[cfg(test)]
    pub async fn last_seen(&self, username: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().await;
        let ts = conn
            .query_row(
                "SELECT last_seen FROM users WHERE username = ?1",
                rusqlite::params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;

    fn entry(username: &str, user_id: u64, name: &str) -> DirectoryEntry {
        DirectoryEntry {
            username: username.to_string(),
            user_id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = DirectoryStore::open_in_memory().unwrap();
        store.upsert_user(&entry("alice", 42, "Alice A")).await.unwrap();

        let found = store.get_user("alice").await.unwrap();
        assert_eq!(found, Some(entry("alice", 42, "Alice A")));
        assert!(store.last_seen("alice").await.unwrap().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let store = DirectoryStore::open_in_memory().unwrap();
        assert_eq!(store.get_user("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_refreshes_existing_handle() {
        let store = DirectoryStore::open_in_memory().unwrap();
        store.upsert_user(&entry("alice", 42, "Alice")).await.unwrap();
        // Handle reassigned to another account
        store.upsert_user(&entry("alice", 99, "Other Alice")).await.unwrap();

        let found = store.get_user("alice").await.unwrap().unwrap();
        assert_eq!(found.user_id, 99);
        assert_eq!(found.name, "Other Alice");
    }

    #[tokio::test]
    async fn test_lookup_is_exact() {
        let store = DirectoryStore::open_in_memory().unwrap();
        store.upsert_user(&entry("Alice", 1, "A")).await.unwrap();
        assert_eq!(store.get_user("alice").await.unwrap(), None);
    }
}
