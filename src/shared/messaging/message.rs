//! Chat Message Data Structures
//!
//! A [`Message`] is the client-side record of one chat entry. Messages carry
//! two identifiers: `local_id` is minted at creation time and never changes,
//! while `id` starts equal to `local_id` and is replaced by the backend's
//! canonical identifier once delivery is acknowledged. Old identifiers keep
//! resolving through the owning stream's alias map.
//!
//! The wire-facing counterparts ([`RemoteMessage`], [`MessageReceipt`],
//! [`SendMessageRequest`]) mirror the backend's JSON field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The local user
    User,
    /// The remote support party
    Remote,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Remote => "remote",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "user" => Sender::User,
            _ => Sender::Remote,
        }
    }
}

/// Delivery lifecycle of a message.
///
/// User-authored messages move forward only: `Pending` to `Sent` on
/// acknowledgement, `Pending` to `Failed` on send failure. A `Failed` message
/// goes back to `Pending` solely through the explicit resend path. Messages
/// delivered by the backend are created directly as `Received`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    /// Send in flight, not yet acknowledged
    Pending,
    /// Acknowledged by the backend
    Sent,
    /// Send failed, eligible for resend
    Failed,
    /// Delivered by the backend
    Received,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Pending => "pending",
            DeliveryState::Sent => "sent",
            DeliveryState::Failed => "failed",
            DeliveryState::Received => "received",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "sent" => DeliveryState::Sent,
            "failed" => DeliveryState::Failed,
            "received" => DeliveryState::Received,
            _ => DeliveryState::Pending,
        }
    }
}

/// Reference to an uploaded file attached to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    /// Original file name
    pub file_name: String,
    /// MIME type of the file
    pub file_type: String,
    /// Backend URL once uploaded
    #[serde(default)]
    pub remote_url: Option<String>,
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Current identifier (canonical once acknowledged)
    pub id: String,
    /// Identifier minted at creation, stable for the message's lifetime
    pub local_id: String,
    /// Conversation this message belongs to
    pub conversation_id: String,
    /// Account name of the local user the conversation belongs to
    pub username: String,
    /// Message body
    pub text: String,
    /// Attached files
    pub attachments: Vec<AttachmentRef>,
    /// When the message was created or acknowledged
    pub timestamp: DateTime<Utc>,
    /// Who authored the message
    pub sender: Sender,
    /// Delivery lifecycle state
    pub delivery_state: DeliveryState,
}

impl Message {
    /// Create an optimistic user-authored message in `Pending` state
    pub fn new_user(
        id: String,
        conversation_id: impl Into<String>,
        username: impl Into<String>,
        text: impl Into<String>,
        attachments: Vec<AttachmentRef>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            local_id: id.clone(),
            id,
            conversation_id: conversation_id.into(),
            username: username.into(),
            text: text.into(),
            attachments,
            timestamp,
            sender: Sender::User,
            delivery_state: DeliveryState::Pending,
        }
    }

    /// Materialize a backend-delivered message in `Received` state
    pub fn from_remote(remote: &RemoteMessage, conversation_id: &str) -> Self {
        let id = remote.effective_id();
        Self {
            local_id: id.clone(),
            id,
            conversation_id: conversation_id.to_string(),
            username: remote.username.clone(),
            text: remote.text.clone(),
            attachments: remote.attachments.clone(),
            timestamp: remote.timestamp,
            sender: remote.sender.unwrap_or(Sender::Remote),
            delivery_state: DeliveryState::Received,
        }
    }

    /// Total-order key: timestamp first, identifier as tie-breaker
    pub fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.timestamp, self.id.as_str())
    }

    pub fn is_user_sent(&self) -> bool {
        self.sender == Sender::User
    }
}

/// A message as the backend reports it.
///
/// Field names follow the backend JSON (`message` is the body). `id` may be
/// absent for webhook deliveries; [`RemoteMessage::effective_id`] derives a
/// stable substitute in that case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sender: Option<Sender>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

impl RemoteMessage {
    /// The backend identifier, or a deterministic UUIDv5 derived from
    /// `username|text|timestamp` when the backend did not provide one.
    ///
    /// Deriving instead of minting a random identifier keeps repeated
    /// deliveries of the same payload idempotent.
    pub fn effective_id(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => {
                let seed = format!(
                    "{}|{}|{}",
                    self.username,
                    self.text,
                    self.timestamp.to_rfc3339()
                );
                Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
            }
        }
    }
}

/// Request body for sending a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub username: String,
    pub conversation_id: Option<String>,
    pub message: String,
    pub attachments: Vec<AttachmentRef>,
    pub timestamp: DateTime<Utc>,
    pub app_name: String,
    pub version: String,
}

/// Acknowledgement returned by the backend for a sent message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceipt {
    /// Canonical conversation identifier
    pub conversation_id: String,
    /// Canonical message identifier
    pub message_id: String,
    /// Canonical timestamp assigned by the backend
    pub timestamp: DateTime<Utc>,
}

/// Response body for listing the messages of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<RemoteMessage>,
}

/// Response body for an attachment upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub attachment_ref: AttachmentRef,
}

/// Request body for registering a webhook endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWebhookRequest {
    pub url: String,
    pub events: Vec<String>,
}
