//! Session value persistence
//!
//! Small key/value table holding session-scoped settings, most importantly
//! the active username restored on app start.

use sqlx::Row;

use super::{LocalStore, Result};

/// Key under which the active username is stored
pub const ACTIVE_USERNAME_KEY: &str = "active_username";

impl LocalStore {
    /// Set a session value
    pub async fn set_session_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO session (key, value, updated_at) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Read a session value
    pub async fn session_value(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM session WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|r| r.try_get("value").unwrap_or_default()))
    }

    /// Remove a session value
    pub async fn remove_session_value(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE key = ?")
            .bind(key)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    pub async fn set_active_username(&self, username: &str) -> Result<()> {
        self.set_session_value(ACTIVE_USERNAME_KEY, username).await
    }

    pub async fn active_username(&self) -> Result<Option<String>> {
        self.session_value(ACTIVE_USERNAME_KEY).await
    }

    pub async fn clear_active_username(&self) -> Result<()> {
        self.remove_session_value(ACTIVE_USERNAME_KEY).await
    }
}
