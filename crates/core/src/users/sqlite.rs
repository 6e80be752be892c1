//! SQLite-backed user store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{User, UserStore, UserStoreError, TIMESTAMP_FORMAT, USERS_TABLE_LIMIT};

/// SQLite-backed user store.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, UserStoreError> {
        let conn = Connection::open(path).map_err(|e| UserStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, UserStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| UserStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), UserStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                telegram_id INTEGER NOT NULL UNIQUE,
                telegram_username TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at);
            CREATE INDEX IF NOT EXISTS idx_users_updated ON users(updated_at);
            "#,
        )
        .map_err(|e| UserStoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Same as [`UserStore::create_or_update`] with an explicit clock.
    pub fn create_or_update_at(
        &self,
        telegram_id: i64,
        username: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserStoreError> {
        let conn = self.conn.lock().map_err(|_| UserStoreError::LockPoisoned)?;
        let now = now.format(TIMESTAMP_FORMAT).to_string();

        let updated = conn
            .execute(
                "UPDATE users SET telegram_username = ?, updated_at = ? WHERE telegram_id = ?",
                params![username, now, telegram_id],
            )
            .map_err(|e| UserStoreError::Database(e.to_string()))?;

        if updated > 0 {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO users (id, telegram_id, telegram_username, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![Uuid::new_v4().to_string(), telegram_id, username, now, now],
        )
        .map_err(|e| UserStoreError::Database(e.to_string()))?;

        conn.query_row(
            "SELECT seq, id, telegram_id, telegram_username, created_at, updated_at
             FROM users WHERE telegram_id = ?",
            params![telegram_id],
            row_to_user,
        )
        .optional()
        .map_err(|e| UserStoreError::Database(e.to_string()))
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(User {
        rowid: row.get(0)?,
        id: row.get(1)?,
        telegram_id: row.get(2)?,
        username: row.get(3)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

impl UserStore for SqliteUserStore {
    fn create_or_update(
        &self,
        telegram_id: i64,
        username: Option<&str>,
    ) -> Result<Option<User>, UserStoreError> {
        self.create_or_update_at(telegram_id, username, Utc::now())
    }

    fn recent(&self, sort_by_updated: bool) -> Result<Vec<User>, UserStoreError> {
        let conn = self.conn.lock().map_err(|_| UserStoreError::LockPoisoned)?;

        let sql = if sort_by_updated {
            "SELECT seq, id, telegram_id, telegram_username, created_at, updated_at
             FROM users WHERE created_at != updated_at
             ORDER BY updated_at DESC, seq DESC LIMIT ?"
        } else {
            "SELECT seq, id, telegram_id, telegram_username, created_at, updated_at
             FROM users ORDER BY created_at DESC, seq DESC LIMIT ?"
        };

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| UserStoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![USERS_TABLE_LIMIT], row_to_user)
            .map_err(|e| UserStoreError::Database(e.to_string()))?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(|e| UserStoreError::Database(e.to_string()))?);
        }

        // Newest last
        users.reverse();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_create_returns_user_only_once() {
        let store = SqliteUserStore::in_memory().unwrap();

        let created = store.create_or_update_at(100, Some("alice"), t(0)).unwrap();
        let user = created.expect("new user is returned");
        assert_eq!(user.telegram_id, 100);
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.created_at, user.updated_at);
        assert!(Uuid::parse_str(&user.id).is_ok());

        let again = store.create_or_update_at(100, Some("alice2"), t(60)).unwrap();
        assert!(again.is_none());

        let users = store.recent(false).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username.as_deref(), Some("alice2"));
        assert_eq!(users[0].updated_at, t(60));
    }

    #[test]
    fn test_recent_limits_and_orders() {
        let store = SqliteUserStore::in_memory().unwrap();
        for i in 0..12 {
            store.create_or_update_at(i, None, t(i * 10)).unwrap();
        }

        let users = store.recent(false).unwrap();
        assert_eq!(users.len(), 10);
        assert_eq!(users.first().unwrap().telegram_id, 2);
        assert_eq!(users.last().unwrap().telegram_id, 11);
    }

    #[test]
    fn test_recent_sorted_by_updated_skips_untouched() {
        let store = SqliteUserStore::in_memory().unwrap();
        store.create_or_update_at(1, Some("a"), t(0)).unwrap();
        store.create_or_update_at(2, Some("b"), t(1)).unwrap();
        store.create_or_update_at(3, Some("c"), t(2)).unwrap();
        store.create_or_update_at(3, Some("c"), t(100)).unwrap();
        store.create_or_update_at(1, Some("a"), t(200)).unwrap();

        let users = store.recent(true).unwrap();
        let ids: Vec<i64> = users.iter().map(|u| u.telegram_id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_table() {
        let store = SqliteUserStore::in_memory().unwrap();
        assert_eq!(store.table(false).unwrap(), "No users");

        store.create_or_update_at(7, Some("bob"), t(0)).unwrap();
        let table = store.table(false).unwrap();
        assert_eq!(table, "1. | 7 | @bob | 2024-05-01 08:00:00 | -");
    }

    #[test]
    fn test_persists_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.db");

        {
            let store = SqliteUserStore::new(&path).unwrap();
            store.create_or_update(9, Some("carol")).unwrap();
        }

        let store = SqliteUserStore::new(&path).unwrap();
        assert!(store.create_or_update(9, Some("carol")).unwrap().is_none());
        assert_eq!(store.recent(false).unwrap().len(), 1);
    }
}
