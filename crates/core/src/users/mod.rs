//! Known users.
//!
//! Every sender is recorded on first contact and touched on each request, so
//! the operator can see who is using the relay.

mod sqlite;
mod types;

pub use sqlite::SqliteUserStore;
pub use types::*;

use chrono::{DateTime, Utc};

/// Trait for user storage.
pub trait UserStore: Send + Sync {
    /// Inserts or refreshes a user.
    ///
    /// Returns the user only when it was newly created.
    fn create_or_update(
        &self,
        telegram_id: i64,
        username: Option<&str>,
    ) -> Result<Option<User>, UserStoreError>;

    /// Up to [`USERS_TABLE_LIMIT`] most recent users, oldest first.
    ///
    /// When `sort_by_updated` is set, only users seen again after their
    /// first contact are listed, ordered by last activity.
    fn recent(&self, sort_by_updated: bool) -> Result<Vec<User>, UserStoreError>;

    /// Plain-text table of recent users, `No users` when empty.
    fn table(&self, sort_by_updated: bool) -> Result<String, UserStoreError> {
        Ok(format_table(&self.recent(sort_by_updated)?, Utc::now()))
    }
}

/// Renders users one per line.
pub fn format_table(users: &[User], now: DateTime<Utc>) -> String {
    if users.is_empty() {
        return "No users".to_string();
    }

    users
        .iter()
        .map(|user| {
            format!(
                "{} | {} | {}",
                user.description(),
                user.created_at.format(TIMESTAMP_FORMAT),
                user.updated_ago(now)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
