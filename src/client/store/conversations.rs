//! Conversation persistence operations

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{LocalStore, Result};
use crate::shared::messaging::{Conversation, ConversationSyncState};

impl LocalStore {
    /// Insert or replace a conversation row
    pub async fn upsert_conversation(&self, conversation: &Conversation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO conversations
                (id, local_id, username, topic, created_at, sync_state)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&conversation.id)
        .bind(&conversation.local_id)
        .bind(&conversation.username)
        .bind(&conversation.topic)
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.sync_state.as_str())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Re-key a conversation to its canonical identifier.
    ///
    /// Removes the row stored under `old_id`, writes the updated conversation
    /// and points every message row at the new id, all in one transaction.
    pub async fn migrate_conversation_id(
        &self,
        old_id: &str,
        conversation: &Conversation,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(old_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO conversations
                (id, local_id, username, topic, created_at, sync_state)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&conversation.id)
        .bind(&conversation.local_id)
        .bind(&conversation.username)
        .bind(&conversation.topic)
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.sync_state.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE messages SET conversation_id = ? WHERE conversation_id = ?")
            .bind(&conversation.id)
            .bind(old_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Load all conversations of a user, most recent first
    pub async fn conversations_for(&self, username: &str) -> Result<Vec<Conversation>> {
        let rows = sqlx::query(
            "SELECT id, local_id, username, topic, created_at, sync_state \
             FROM conversations WHERE username = ? ORDER BY created_at DESC, id ASC",
        )
        .bind(username)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(row_to_conversation).collect())
    }
}

fn row_to_conversation(row: &SqliteRow) -> Conversation {
    let created_at: String = row.try_get("created_at").unwrap_or_default();

    Conversation {
        id: row.try_get("id").unwrap_or_default(),
        local_id: row.try_get("local_id").unwrap_or_default(),
        username: row.try_get("username").unwrap_or_default(),
        topic: row.try_get("topic").unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default(),
        sync_state: ConversationSyncState::from_str(
            &row.try_get::<String, _>("sync_state").unwrap_or_default(),
        ),
    }
}
