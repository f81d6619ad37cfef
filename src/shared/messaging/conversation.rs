//! Conversation Data Structure
//!
//! Represents a support conversation between the local user and the remote
//! party. Like messages, conversations carry a stable `local_id` next to the
//! current `id`, which is swapped for the backend's canonical identifier once
//! the conversation is registered remotely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::RemoteMessage;

/// Whether the backend knows about a conversation yet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationSyncState {
    /// Created locally, backend registration not yet acknowledged
    Pending,
    /// Registered with the backend under a canonical identifier
    Synced,
}

impl ConversationSyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationSyncState::Pending => "pending",
            ConversationSyncState::Synced => "synced",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "synced" => ConversationSyncState::Synced,
            _ => ConversationSyncState::Pending,
        }
    }
}

/// A conversation as the client tracks it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    /// Current identifier (canonical once synced)
    pub id: String,
    /// Identifier minted at creation, stable for the conversation's lifetime
    pub local_id: String,
    /// Account name of the local user
    pub username: String,
    /// Subject line chosen when the conversation was started
    pub topic: String,
    /// Creation time (canonical once synced)
    pub created_at: DateTime<Utc>,
    /// Backend registration state
    pub sync_state: ConversationSyncState,
}

impl Conversation {
    /// Create a locally-originated conversation awaiting backend registration
    pub fn new_local(
        id: String,
        username: impl Into<String>,
        topic: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            local_id: id.clone(),
            id,
            username: username.into(),
            topic: topic.into(),
            created_at,
            sync_state: ConversationSyncState::Pending,
        }
    }

    /// Create a conversation already confirmed by the backend
    pub fn new_synced(
        id: String,
        username: impl Into<String>,
        topic: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            local_id: id.clone(),
            id,
            username: username.into(),
            topic: topic.into(),
            created_at,
            sync_state: ConversationSyncState::Synced,
        }
    }

    /// Materialize a conversation from a backend summary
    pub fn from_summary(summary: &ConversationSummary) -> Self {
        Self::new_synced(
            summary.id.clone(),
            summary.username.clone(),
            summary.topic.clone(),
            summary.created_at,
        )
    }

    pub fn is_synced(&self) -> bool {
        self.sync_state == ConversationSyncState::Synced
    }
}

/// A conversation as the backend reports it, optionally with its messages
/// embedded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub username: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<RemoteMessage>,
}

/// Response body for listing a user's conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}
