//! Conversation Registry
//!
//! Authoritative in-memory view of the active user's conversations, with
//! optimistic writes against the remote backend.
//!
//! # Features
//!
//! - **Optimistic creation**: conversations and messages become visible
//!   immediately under locally-minted ids and are re-keyed to canonical
//!   backend ids when the acknowledgement arrives
//! - **Alias resolution**: superseded identifiers keep resolving to the
//!   current entity, so references held across a migration stay valid
//! - **Remote merge**: `refresh` and `open_conversation` fold backend state
//!   into the local view idempotently; local-only pending entities survive
//! - **Inbound ingestion**: webhook payloads are validated, deduplicated and
//!   inserted in timestamp order
//! - **Session fencing**: an epoch counter discards completions that finish
//!   after the session that issued them was torn down
//!
//! Mutations take the write lock only while applying; network calls run with
//! the lock released, so overlapping operations interleave and each
//! completion is applied atomically in completion order.

pub mod reconcile;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::gateway::{self, RemoteGateway};
use crate::client::ids::IdGenerator;
use crate::client::retry::RetryPolicy;
use crate::client::store::LocalStore;
use crate::client::stream::{IngestOutcome, MessageStream};
use crate::shared::error::{ClientError, MalformedPayloadError, NetworkError};
use crate::shared::messaging::{
    AttachmentRef, Conversation, ConversationSummary, ConversationSyncState, Message,
    MessageReceipt, RemoteMessage,
};

/// One conversation with its ordered message stream
#[derive(Debug, Clone)]
struct ConversationEntry {
    info: Conversation,
    stream: MessageStream,
}

/// Lock-protected registry state
#[derive(Debug, Default)]
struct RegistryState {
    /// Conversations keyed by current id
    conversations: HashMap<String, ConversationEntry>,
    /// Superseded conversation id -> current id
    aliases: HashMap<String, String>,
}

impl RegistryState {
    /// Resolve a conversation reference (current or superseded id) to the
    /// current id
    fn resolve_id(&self, reference: &str) -> Option<String> {
        if self.conversations.contains_key(reference) {
            return Some(reference.to_string());
        }
        self.aliases
            .get(reference)
            .filter(|id| self.conversations.contains_key(*id))
            .cloned()
    }

    fn entry(&self, reference: &str) -> Option<&ConversationEntry> {
        let id = self.resolve_id(reference)?;
        self.conversations.get(&id)
    }

    fn entry_mut(&mut self, reference: &str) -> Option<&mut ConversationEntry> {
        let id = self.resolve_id(reference)?;
        self.conversations.get_mut(&id)
    }

    /// Move an entry to a new key, keeping old references resolvable
    fn rekey(&mut self, old_id: &str, new_id: &str) {
        if old_id == new_id {
            return;
        }
        if let Some(mut entry) = self.conversations.remove(old_id) {
            entry.info.id = new_id.to_string();
            entry.stream.set_conversation_id(new_id);
            for target in self.aliases.values_mut() {
                if target == old_id {
                    *target = new_id.to_string();
                }
            }
            self.aliases.insert(old_id.to_string(), new_id.to_string());
            self.conversations.insert(new_id.to_string(), entry);
        }
    }

    /// Conversations ordered most recent first, id as tie-breaker
    fn ordered_conversations(&self) -> Vec<Conversation> {
        let mut items: Vec<Conversation> = self
            .conversations
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        items
    }
}

/// Registry of the active user's conversations
pub struct ConversationRegistry {
    state: RwLock<RegistryState>,
    gateway: Arc<dyn RemoteGateway>,
    store: Arc<LocalStore>,
    ids: Arc<dyn IdGenerator>,
    retry: RetryPolicy,
    /// Bumped by [`clear`](Self::clear); completions holding an older value
    /// are discarded
    epoch: AtomicU64,
}

impl ConversationRegistry {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        store: Arc<LocalStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            gateway,
            store,
            ids,
            retry: RetryPolicy::default(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Replace the retry policy used for read operations
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a conversation optimistically and announce it to the backend.
    ///
    /// The conversation is visible and persisted before the network call.
    /// On acknowledgement it is re-keyed to the canonical id; on failure it
    /// stays `Pending` locally and is still returned.
    pub async fn start_conversation(
        &self,
        username: &str,
        topic: &str,
    ) -> Result<Conversation, ClientError> {
        let username = username.trim();
        let topic = topic.trim();
        if username.is_empty() {
            return Err(ClientError::validation(
                "username",
                "username must not be empty",
            ));
        }
        if topic.is_empty() {
            return Err(ClientError::validation("topic", "topic must not be empty"));
        }

        let conversation =
            Conversation::new_local(self.ids.generate(), username, topic, Utc::now());
        self.store.upsert_conversation(&conversation).await?;
        {
            let mut state = self.state.write().await;
            state.conversations.insert(
                conversation.id.clone(),
                ConversationEntry {
                    info: conversation.clone(),
                    stream: MessageStream::new(),
                },
            );
        }
        info!("started conversation {} ({})", conversation.id, topic);

        self.register_with_backend(conversation).await
    }

    /// Re-announce a conversation whose backend registration failed.
    ///
    /// No-op for conversations that are already synced.
    pub async fn retry_sync(&self, conversation_ref: &str) -> Result<Conversation, ClientError> {
        let conversation = {
            let state = self.state.read().await;
            state.entry(conversation_ref).map(|entry| entry.info.clone())
        }
        .ok_or_else(|| ClientError::UnknownConversation(conversation_ref.to_string()))?;

        if conversation.is_synced() {
            return Ok(conversation);
        }
        self.register_with_backend(conversation).await
    }

    /// Fetch the user's conversations from the backend and merge them into
    /// the local view.
    ///
    /// Reconciles summaries with locally-pending conversations by canonical
    /// id or content signature, adopts remote-only conversations, and merges
    /// any embedded messages. Local-only conversations are never removed.
    /// Returns the merged list, most recent first.
    pub async fn refresh(&self, username: &str) -> Result<Vec<Conversation>, ClientError> {
        let epoch = self.current_epoch();
        let gateway = Arc::clone(&self.gateway);
        let summaries = self
            .retry
            .run(|| gateway.list_conversations(username))
            .await?;

        let mut state = self.state.write().await;
        self.guard_epoch(epoch)?;
        debug!(
            "merging {} remote conversations for {}",
            summaries.len(),
            username
        );
        for summary in &summaries {
            self.apply_summary(&mut state, summary).await?;
        }
        Ok(state.ordered_conversations())
    }

    /// Fetch and merge the remote history of a conversation, returning its
    /// full ordered message list.
    ///
    /// Pending conversations have no remote history; their local messages
    /// are returned without a network call.
    pub async fn open_conversation(
        &self,
        conversation_ref: &str,
    ) -> Result<Vec<Message>, ClientError> {
        let (conversation_id, synced) = {
            let state = self.state.read().await;
            let entry = state
                .entry(conversation_ref)
                .ok_or_else(|| ClientError::UnknownConversation(conversation_ref.to_string()))?;
            (entry.info.id.clone(), entry.info.is_synced())
        };

        if !synced {
            return Ok(self.messages(&conversation_id).await.unwrap_or_default());
        }

        let epoch = self.current_epoch();
        let gateway = Arc::clone(&self.gateway);
        let remote_messages = self
            .retry
            .run(|| gateway.list_messages(&conversation_id))
            .await?;

        let mut state = self.state.write().await;
        self.guard_epoch(epoch)?;
        let current_id = state
            .resolve_id(&conversation_id)
            .ok_or_else(|| ClientError::UnknownConversation(conversation_id.clone()))?;
        self.merge_remote_messages(&mut state, &current_id, &remote_messages)
            .await?;

        Ok(state
            .entry(&current_id)
            .map(|entry| entry.stream.messages().to_vec())
            .unwrap_or_default())
    }

    /// Send a message optimistically.
    ///
    /// The message is appended `Pending` and persisted before the network
    /// call. On acknowledgement it upgrades to `Sent` under the canonical id
    /// (migrating the conversation id too when the backend created the
    /// conversation with this send). On failure it is marked `Failed` and
    /// returned; send failures never surface as errors.
    pub async fn send_user_message(
        &self,
        conversation_ref: &str,
        text: &str,
        attachments: Vec<AttachmentRef>,
    ) -> Result<Message, ClientError> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(ClientError::validation(
                "text",
                "message text must not be empty",
            ));
        }

        let epoch = self.current_epoch();
        let (message, username, wire_conversation_id) = {
            let mut state = self.state.write().await;
            let entry = state
                .entry_mut(conversation_ref)
                .ok_or_else(|| ClientError::UnknownConversation(conversation_ref.to_string()))?;

            let message = Message::new_user(
                self.ids.generate(),
                entry.info.id.clone(),
                entry.info.username.clone(),
                text,
                attachments,
                Utc::now(),
            );
            entry.stream.append(message.clone());
            let username = entry.info.username.clone();
            // Pending conversations are unknown to the backend; sending
            // without an id makes it create one.
            let wire_conversation_id = entry.info.is_synced().then(|| entry.info.id.clone());
            self.store.upsert_message(&message).await?;
            (message, username, wire_conversation_id)
        };

        debug!(
            "sending message {} in conversation {}",
            message.local_id, message.conversation_id
        );
        let result = self
            .gateway
            .send_message(
                &username,
                wire_conversation_id.as_deref(),
                &message.text,
                &message.attachments,
            )
            .await;

        self.apply_send_completion(epoch, &message, result).await
    }

    /// Resend a failed message, reusing its existing entry.
    ///
    /// A message that is not in `Failed` state is returned unchanged.
    pub async fn resend_message(
        &self,
        conversation_ref: &str,
        message_ref: &str,
    ) -> Result<Message, ClientError> {
        let epoch = self.current_epoch();
        let (message, username, wire_conversation_id) = {
            let mut state = self.state.write().await;
            let entry = state
                .entry_mut(conversation_ref)
                .ok_or_else(|| ClientError::UnknownConversation(conversation_ref.to_string()))?;

            let Some(message) = entry.stream.begin_resend(message_ref) else {
                return match entry.stream.get(message_ref) {
                    Some(existing) => Ok(existing.clone()),
                    None => Err(ClientError::UnknownMessage(message_ref.to_string())),
                };
            };
            let username = entry.info.username.clone();
            let wire_conversation_id = entry.info.is_synced().then(|| entry.info.id.clone());
            self.store.upsert_message(&message).await?;
            debug!("resending message {}", message.local_id);
            (message, username, wire_conversation_id)
        };

        let result = self
            .gateway
            .send_message(
                &username,
                wire_conversation_id.as_deref(),
                &message.text,
                &message.attachments,
            )
            .await;

        self.apply_send_completion(epoch, &message, result).await
    }

    /// Ingest a raw webhook payload.
    ///
    /// Malformed payloads are rejected with a log line. The target
    /// conversation is resolved through aliases; an unknown canonical id is
    /// adopted as a synced shell conversation. Duplicate deliveries are
    /// no-ops returning the existing entry.
    pub async fn ingest_inbound(&self, raw: &str) -> Result<Message, ClientError> {
        let remote = match gateway::parse_webhook_payload(raw) {
            Ok(remote) => remote,
            Err(err) => {
                warn!("dropping inbound payload: {}", err);
                return Err(err.into());
            }
        };
        let conversation_id = remote
            .conversation_id
            .clone()
            .ok_or_else(|| MalformedPayloadError::new("missing conversationId"))?;

        let mut state = self.state.write().await;
        let current_id = match state.resolve_id(&conversation_id) {
            Some(id) => id,
            None => {
                // Known to the backend but not locally: adopt a shell with
                // the canonical id. The topic arrives with the next refresh.
                let info = Conversation::new_synced(
                    conversation_id.clone(),
                    remote.username.clone(),
                    String::new(),
                    remote.timestamp,
                );
                self.store.upsert_conversation(&info).await?;
                debug!("adopted conversation {} from inbound delivery", info.id);
                state.conversations.insert(
                    info.id.clone(),
                    ConversationEntry {
                        info,
                        stream: MessageStream::new(),
                    },
                );
                conversation_id.clone()
            }
        };

        let entry = state
            .entry_mut(&current_id)
            .ok_or_else(|| ClientError::UnknownConversation(current_id.clone()))?;
        let outcome = entry.stream.ingest_remote(&remote, &current_id);
        self.persist_outcome(&outcome).await?;

        match &outcome {
            IngestOutcome::Inserted(message) => {
                debug!("inbound message {} inserted", message.id)
            }
            IngestOutcome::Confirmed(message) => {
                info!("inbound delivery confirmed message {}", message.local_id)
            }
            IngestOutcome::Duplicate(message) => {
                debug!("duplicate inbound delivery for message {}", message.id)
            }
        }
        Ok(outcome.message().clone())
    }

    /// Load the user's cached conversations and messages from the local
    /// store, replacing the in-memory view
    pub async fn hydrate(&self, username: &str) -> Result<Vec<Conversation>, ClientError> {
        let conversations = self.store.conversations_for(username).await?;
        let streams = try_join_all(
            conversations
                .iter()
                .map(|conversation| self.store.messages_for(&conversation.id)),
        )
        .await?;

        let mut state = self.state.write().await;
        state.conversations.clear();
        state.aliases.clear();
        for (info, messages) in conversations.into_iter().zip(streams) {
            if info.local_id != info.id {
                state.aliases.insert(info.local_id.clone(), info.id.clone());
            }
            state.conversations.insert(
                info.id.clone(),
                ConversationEntry {
                    stream: MessageStream::from_messages(messages),
                    info,
                },
            );
        }
        debug!(
            "hydrated {} conversations for {}",
            state.conversations.len(),
            username
        );
        Ok(state.ordered_conversations())
    }

    /// Drop all in-memory state and fence out in-flight completions.
    ///
    /// The epoch is bumped before the state is cleared, so a completion
    /// racing this call can never re-apply old data afterwards.
    pub async fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        state.conversations.clear();
        state.aliases.clear();
        debug!("registry cleared");
    }

    /// Snapshot of all conversations, most recent first
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.ordered_conversations()
    }

    /// Look up a conversation by current or superseded id
    pub async fn get(&self, conversation_ref: &str) -> Option<Conversation> {
        let state = self.state.read().await;
        state.entry(conversation_ref).map(|entry| entry.info.clone())
    }

    /// Snapshot of a conversation's messages in `(timestamp, id)` order
    pub async fn messages(&self, conversation_ref: &str) -> Option<Vec<Message>> {
        let state = self.state.read().await;
        state
            .entry(conversation_ref)
            .map(|entry| entry.stream.messages().to_vec())
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn guard_epoch(&self, snapshot: u64) -> Result<(), ClientError> {
        if self.current_epoch() != snapshot {
            debug!("discarding completion from a torn-down session");
            return Err(ClientError::NoActiveSession);
        }
        Ok(())
    }

    /// Announce a locally-created conversation with a synthetic opener
    /// message and adopt the canonical id from the acknowledgement
    async fn register_with_backend(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, ClientError> {
        let epoch = self.current_epoch();
        let opener = format!("Conversa iniciada: {}", conversation.topic);

        match self
            .gateway
            .send_message(&conversation.username, None, &opener, &[])
            .await
        {
            Ok(receipt) => {
                let mut state = self.state.write().await;
                self.guard_epoch(epoch)?;

                let current_id = state.resolve_id(&conversation.id).ok_or_else(|| {
                    ClientError::UnknownConversation(conversation.id.clone())
                })?;
                if current_id != receipt.conversation_id {
                    state.rekey(&current_id, &receipt.conversation_id);
                }
                let entry = state.entry_mut(&receipt.conversation_id).ok_or_else(|| {
                    ClientError::UnknownConversation(receipt.conversation_id.clone())
                })?;
                entry.info.created_at = receipt.timestamp;
                entry.info.sync_state = ConversationSyncState::Synced;
                self.store
                    .migrate_conversation_id(&current_id, &entry.info)
                    .await?;
                info!(
                    "conversation {} registered under canonical id {}",
                    current_id, receipt.conversation_id
                );
                Ok(entry.info.clone())
            }
            Err(err) => {
                warn!(
                    "backend registration failed for conversation {}: {}",
                    conversation.id, err
                );
                self.guard_epoch(epoch)?;
                Ok(conversation)
            }
        }
    }

    /// Apply the outcome of a send request under the write lock
    async fn apply_send_completion(
        &self,
        epoch: u64,
        optimistic: &Message,
        result: Result<MessageReceipt, NetworkError>,
    ) -> Result<Message, ClientError> {
        match result {
            Ok(receipt) => {
                let mut state = self.state.write().await;
                self.guard_epoch(epoch)?;

                let current_id =
                    state
                        .resolve_id(&optimistic.conversation_id)
                        .ok_or_else(|| {
                            ClientError::UnknownConversation(optimistic.conversation_id.clone())
                        })?;
                if current_id != receipt.conversation_id {
                    state.rekey(&current_id, &receipt.conversation_id);
                }
                let entry = state.entry_mut(&receipt.conversation_id).ok_or_else(|| {
                    ClientError::UnknownConversation(receipt.conversation_id.clone())
                })?;
                if !entry.info.is_synced() || current_id != receipt.conversation_id {
                    entry.info.sync_state = ConversationSyncState::Synced;
                    self.store
                        .migrate_conversation_id(&current_id, &entry.info)
                        .await?;
                    info!(
                        "conversation {} migrated to canonical id {}",
                        current_id, receipt.conversation_id
                    );
                }

                let updated = entry
                    .stream
                    .mark_sent(&optimistic.local_id, &receipt)
                    .ok_or_else(|| ClientError::UnknownMessage(optimistic.local_id.clone()))?;
                self.store.replace_message(&updated).await?;
                info!("message {} delivered as {}", updated.local_id, updated.id);
                Ok(updated)
            }
            Err(err) => {
                warn!("send failed for message {}: {}", optimistic.local_id, err);
                let mut state = self.state.write().await;
                self.guard_epoch(epoch)?;

                let entry = state
                    .entry_mut(&optimistic.conversation_id)
                    .ok_or_else(|| {
                        ClientError::UnknownConversation(optimistic.conversation_id.clone())
                    })?;
                let failed = entry
                    .stream
                    .mark_failed(&optimistic.local_id)
                    .ok_or_else(|| ClientError::UnknownMessage(optimistic.local_id.clone()))?;
                self.store.upsert_message(&failed).await?;
                Ok(failed)
            }
        }
    }

    /// Merge one backend conversation summary into the local view
    async fn apply_summary(
        &self,
        state: &mut RegistryState,
        summary: &ConversationSummary,
    ) -> Result<(), ClientError> {
        if let Some(current_id) = state.resolve_id(&summary.id) {
            // Already known: canonical metadata wins.
            if let Some(entry) = state.entry_mut(&current_id) {
                entry.info.topic = summary.topic.clone();
                entry.info.created_at = summary.created_at;
                entry.info.sync_state = ConversationSyncState::Synced;
                self.store.upsert_conversation(&entry.info).await?;
            }
        } else if let Some(local_id) = reconcile::match_pending_conversation(
            state.conversations.values().map(|entry| &entry.info),
            summary,
        ) {
            state.rekey(&local_id, &summary.id);
            if let Some(entry) = state.entry_mut(&summary.id) {
                entry.info.topic = summary.topic.clone();
                entry.info.created_at = summary.created_at;
                entry.info.sync_state = ConversationSyncState::Synced;
                self.store
                    .migrate_conversation_id(&local_id, &entry.info)
                    .await?;
                info!(
                    "conversation {} reconciled to canonical id {}",
                    local_id, summary.id
                );
            }
        } else {
            let info = Conversation::from_summary(summary);
            self.store.upsert_conversation(&info).await?;
            debug!("adopted remote conversation {}", info.id);
            state.conversations.insert(
                info.id.clone(),
                ConversationEntry {
                    info,
                    stream: MessageStream::new(),
                },
            );
        }

        if summary.messages.is_empty() {
            return Ok(());
        }
        let Some(current_id) = state.resolve_id(&summary.id) else {
            return Ok(());
        };
        self.merge_remote_messages(state, &current_id, &summary.messages)
            .await
    }

    /// Fold backend-reported messages into a conversation's stream
    async fn merge_remote_messages(
        &self,
        state: &mut RegistryState,
        conversation_id: &str,
        remote_messages: &[RemoteMessage],
    ) -> Result<(), ClientError> {
        let Some(entry) = state.entry_mut(conversation_id) else {
            return Ok(());
        };
        for remote in remote_messages {
            let outcome = entry.stream.ingest_remote(remote, conversation_id);
            self.persist_outcome(&outcome).await?;
        }
        Ok(())
    }

    async fn persist_outcome(&self, outcome: &IngestOutcome) -> Result<(), ClientError> {
        match outcome {
            IngestOutcome::Inserted(message) => self.store.upsert_message(message).await?,
            IngestOutcome::Confirmed(message) => self.store.replace_message(message).await?,
            IngestOutcome::Duplicate(_) => {}
        }
        Ok(())
    }
}
