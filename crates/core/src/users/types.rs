//! User types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Timestamps are stored and displayed with second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rows shown by the users table.
pub const USERS_TABLE_LIMIT: u32 = 10;

/// A sender that has used the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub rowid: i64,
    /// Random identifier, independent from the transport id.
    pub id: String,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// `rowid. | telegram_id | @username`
    pub fn description(&self) -> String {
        let username = match &self.username {
            Some(name) => format!("@{}", name),
            None => "-".to_string(),
        };
        format!("{}. | {} | {}", self.rowid, self.telegram_id, username)
    }

    /// Time since last activity, `-` if never seen after creation.
    pub fn updated_ago(&self, now: DateTime<Utc>) -> String {
        if self.updated_at == self.created_at {
            return "-".to_string();
        }

        let total = (now - self.updated_at).num_seconds().max(0);
        let days = total / 86_400;
        let (hours, minutes, seconds) = ((total % 86_400) / 3600, (total % 3600) / 60, total % 60);
        let clock = format!("{}:{:02}:{:02}", hours, minutes, seconds);

        match days {
            0 => format!("{} ago", clock),
            1 => format!("1 day, {} ago", clock),
            n => format!("{} days, {} ago", n, clock),
        }
    }
}

/// Errors for user store operations.
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(updated_offset_secs: i64) -> User {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        User {
            rowid: 3,
            id: "a-b-c".to_string(),
            telegram_id: 4242,
            username: Some("alice".to_string()),
            created_at: created,
            updated_at: created + chrono::Duration::seconds(updated_offset_secs),
        }
    }

    #[test]
    fn test_description() {
        assert_eq!(user(0).description(), "3. | 4242 | @alice");

        let mut anonymous = user(0);
        anonymous.username = None;
        assert_eq!(anonymous.description(), "3. | 4242 | -");
    }

    #[test]
    fn test_updated_ago() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 13, 0, 5).unwrap();
        assert_eq!(user(0).updated_ago(now), "-");
        // updated at 2024-03-01 12:00:10
        assert_eq!(user(10).updated_ago(now), "2 days, 0:59:55 ago");

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 10).unwrap();
        assert_eq!(user(10).updated_ago(now), "0:05:00 ago");
    }
}
