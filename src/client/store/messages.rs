//! Message persistence operations

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{LocalStore, Result};
use crate::shared::messaging::{DeliveryState, Message, Sender};

impl LocalStore {
    /// Insert or replace a message row
    pub async fn upsert_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO messages
                (conversation_id, id, local_id, username, text, timestamp,
                 sender, delivery_state, attachments_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.conversation_id)
        .bind(&message.id)
        .bind(&message.local_id)
        .bind(&message.username)
        .bind(&message.text)
        .bind(message.timestamp.to_rfc3339())
        .bind(message.sender.as_str())
        .bind(message.delivery_state.as_str())
        .bind(serde_json::to_string(&message.attachments).unwrap_or_else(|_| "[]".to_string()))
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Insert or replace several message rows in one transaction
    pub async fn upsert_messages(&self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        for message in messages {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO messages
                    (conversation_id, id, local_id, username, text, timestamp,
                     sender, delivery_state, attachments_json)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&message.conversation_id)
            .bind(&message.id)
            .bind(&message.local_id)
            .bind(&message.username)
            .bind(&message.text)
            .bind(message.timestamp.to_rfc3339())
            .bind(message.sender.as_str())
            .bind(message.delivery_state.as_str())
            .bind(serde_json::to_string(&message.attachments).unwrap_or_else(|_| "[]".to_string()))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Replace a message row whose id changed.
    ///
    /// Deletes the existing row through the immutable `local_id`, which keeps
    /// resolving no matter how often the public id migrated, then writes the
    /// updated message in one transaction. Safe when no old row exists.
    pub async fn replace_message(&self, message: &Message) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = ? AND local_id = ?")
            .bind(&message.conversation_id)
            .bind(&message.local_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO messages
                (conversation_id, id, local_id, username, text, timestamp,
                 sender, delivery_state, attachments_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.conversation_id)
        .bind(&message.id)
        .bind(&message.local_id)
        .bind(&message.username)
        .bind(&message.text)
        .bind(message.timestamp.to_rfc3339())
        .bind(message.sender.as_str())
        .bind(message.delivery_state.as_str())
        .bind(serde_json::to_string(&message.attachments).unwrap_or_else(|_| "[]".to_string()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Load the messages of a conversation in (timestamp, id) order
    pub async fn messages_for(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT conversation_id, id, local_id, username, text, timestamp, \
             sender, delivery_state, attachments_json \
             FROM messages WHERE conversation_id = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }
}

fn row_to_message(row: &SqliteRow) -> Message {
    let timestamp: String = row.try_get("timestamp").unwrap_or_default();
    let attachments_json: String = row.try_get("attachments_json").unwrap_or_default();

    Message {
        conversation_id: row.try_get("conversation_id").unwrap_or_default(),
        id: row.try_get("id").unwrap_or_default(),
        local_id: row.try_get("local_id").unwrap_or_default(),
        username: row.try_get("username").unwrap_or_default(),
        text: row.try_get("text").unwrap_or_default(),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default(),
        sender: Sender::from_str(&row.try_get::<String, _>("sender").unwrap_or_default()),
        delivery_state: DeliveryState::from_str(
            &row.try_get::<String, _>("delivery_state").unwrap_or_default(),
        ),
        attachments: serde_json::from_str(&attachments_json).unwrap_or_default(),
    }
}
