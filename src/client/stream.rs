//! Ordered Message Stream
//!
//! In-memory message log of one conversation, kept sorted by the total order
//! `(timestamp, id)`. All mutation is idempotent: a message whose id (or any
//! of its superseded identifiers) is already present is never inserted twice,
//! so remote merges and webhook deliveries can be replayed safely in any
//! order.
//!
//! The stream is pure data manipulation; the registry layers persistence and
//! networking on top of it.

use std::collections::HashMap;

use tracing::debug;

use crate::client::registry::reconcile;
use crate::shared::messaging::{DeliveryState, Message, MessageReceipt, RemoteMessage};

/// Outcome of merging one remote message into a stream
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// A new entry was inserted
    Inserted(Message),
    /// An optimistic user message was confirmed in place
    Confirmed(Message),
    /// The message was already present; nothing changed
    Duplicate(Message),
}

impl IngestOutcome {
    /// The stream entry the remote message mapped to
    pub fn message(&self) -> &Message {
        match self {
            IngestOutcome::Inserted(m)
            | IngestOutcome::Confirmed(m)
            | IngestOutcome::Duplicate(m) => m,
        }
    }

    /// Whether the stream was modified
    pub fn changed(&self) -> bool {
        !matches!(self, IngestOutcome::Duplicate(_))
    }
}

/// Sorted, deduplicated message log of a single conversation
#[derive(Debug, Clone, Default)]
pub struct MessageStream {
    messages: Vec<Message>,
    /// Superseded identifier -> current identifier
    aliases: HashMap<String, String>,
}

impl MessageStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a stream from persisted messages, restoring sort order and the
    /// aliases implied by migrated identifiers
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut stream = Self::new();
        for message in messages {
            if message.local_id != message.id {
                stream
                    .aliases
                    .insert(message.local_id.clone(), message.id.clone());
            }
            stream.insert_sorted(message);
        }
        stream
    }

    /// Messages in `(timestamp, id)` order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by current id, original local id, or any superseded
    /// identifier
    pub fn get(&self, message_ref: &str) -> Option<&Message> {
        self.position_of(message_ref).map(|i| &self.messages[i])
    }

    /// Insert a message unless one of its identifiers is already present.
    /// Returns whether the stream changed.
    pub fn append(&mut self, message: Message) -> bool {
        if self.position_of(&message.id).is_some() || self.position_of(&message.local_id).is_some()
        {
            return false;
        }
        self.insert_sorted(message);
        true
    }

    /// Merge a backend-reported message.
    ///
    /// Deduplicates by effective id first. A remote echo that content-matches
    /// an optimistic user message confirms that message in place (adopting
    /// the canonical id and timestamp when provided) instead of inserting a
    /// duplicate. Everything else is inserted as a `Received` entry.
    pub fn ingest_remote(&mut self, remote: &RemoteMessage, conversation_id: &str) -> IngestOutcome {
        let effective_id = remote.effective_id();
        if let Some(index) = self.position_of(&effective_id) {
            return IngestOutcome::Duplicate(self.messages[index].clone());
        }

        if let Some(index) = reconcile::match_optimistic_message(&self.messages, remote) {
            if self.messages[index].delivery_state == DeliveryState::Pending {
                {
                    let message = &mut self.messages[index];
                    message.delivery_state = DeliveryState::Sent;
                    message.timestamp = remote.timestamp;
                    if let Some(remote_id) = remote.id.as_deref() {
                        self.aliases
                            .insert(message.id.clone(), remote_id.to_string());
                        message.id = remote_id.to_string();
                    } else {
                        // Make replays of the same id-less payload O(1) dups.
                        self.aliases.insert(effective_id, message.id.clone());
                    }
                }
                let index = self.resort(index);
                debug!(
                    "remote echo confirmed optimistic message {}",
                    self.messages[index].local_id
                );
                return IngestOutcome::Confirmed(self.messages[index].clone());
            }
            return IngestOutcome::Duplicate(self.messages[index].clone());
        }

        let message = Message::from_remote(remote, conversation_id);
        let index = self.insert_sorted(message);
        IngestOutcome::Inserted(self.messages[index].clone())
    }

    /// Apply a send acknowledgement: upgrade to `Sent` and adopt the
    /// canonical id and timestamp.
    ///
    /// The old identifier keeps resolving through the alias map. Applying the
    /// same receipt again is a no-op; a `Failed` or `Received` entry is never
    /// touched.
    pub fn mark_sent(&mut self, message_ref: &str, receipt: &MessageReceipt) -> Option<Message> {
        let index = self.position_of(message_ref)?;
        match self.messages[index].delivery_state {
            DeliveryState::Pending | DeliveryState::Sent => {
                {
                    let message = &mut self.messages[index];
                    message.delivery_state = DeliveryState::Sent;
                    message.timestamp = receipt.timestamp;
                    if message.id != receipt.message_id {
                        self.aliases
                            .insert(message.id.clone(), receipt.message_id.clone());
                        message.id = receipt.message_id.clone();
                    }
                }
                let index = self.resort(index);
                Some(self.messages[index].clone())
            }
            _ => Some(self.messages[index].clone()),
        }
    }

    /// Mark a pending send as failed. Anything not pending is left untouched.
    pub fn mark_failed(&mut self, message_ref: &str) -> Option<Message> {
        let index = self.position_of(message_ref)?;
        if self.messages[index].delivery_state == DeliveryState::Pending {
            self.messages[index].delivery_state = DeliveryState::Failed;
        }
        Some(self.messages[index].clone())
    }

    /// Move a failed message back to `Pending` ahead of a resend.
    ///
    /// Returns `None` when the reference is unknown or the message is not in
    /// `Failed` state; the existing entry is reused so a resend can never
    /// duplicate the message.
    pub fn begin_resend(&mut self, message_ref: &str) -> Option<Message> {
        let index = self.position_of(message_ref)?;
        if self.messages[index].delivery_state != DeliveryState::Failed {
            return None;
        }
        self.messages[index].delivery_state = DeliveryState::Pending;
        Some(self.messages[index].clone())
    }

    /// Rewrite the conversation id carried by every message (conversation id
    /// migration)
    pub fn set_conversation_id(&mut self, conversation_id: &str) {
        for message in &mut self.messages {
            message.conversation_id = conversation_id.to_string();
        }
    }

    fn position_of(&self, message_ref: &str) -> Option<usize> {
        let target = self
            .aliases
            .get(message_ref)
            .map(String::as_str)
            .unwrap_or(message_ref);
        self.messages
            .iter()
            .position(|m| m.id == target || m.local_id == target)
    }

    fn insert_sorted(&mut self, message: Message) -> usize {
        let index = self
            .messages
            .binary_search_by(|m| m.sort_key().cmp(&message.sort_key()))
            .unwrap_or_else(|i| i);
        self.messages.insert(index, message);
        index
    }

    fn resort(&mut self, index: usize) -> usize {
        let message = self.messages.remove(index);
        self.insert_sorted(message)
    }
}
