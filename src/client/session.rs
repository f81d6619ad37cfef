//! Session Context
//!
//! Binds the conversation registry to one active account. Login hydrates the
//! cached view from the local store before going to the network, so a user
//! sees their conversations immediately even when offline. Logout purges the
//! account's cached rows and fences out any operations still in flight.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::client::registry::ConversationRegistry;
use crate::client::store::LocalStore;
use crate::shared::error::ClientError;
use crate::shared::messaging::Conversation;

/// The client's view of who is logged in
pub struct SessionContext {
    registry: Arc<ConversationRegistry>,
    store: Arc<LocalStore>,
    active_username: RwLock<Option<String>>,
}

impl SessionContext {
    pub fn new(registry: Arc<ConversationRegistry>, store: Arc<LocalStore>) -> Self {
        Self {
            registry,
            store,
            active_username: RwLock::new(None),
        }
    }

    /// Start a session for `username`.
    ///
    /// Any previous session is torn down first. The cached conversation list
    /// is loaded from the local store, then refreshed from the backend; when
    /// the backend is unreachable the cached list is returned and the session
    /// is still established.
    pub async fn login(&self, username: &str) -> Result<Vec<Conversation>, ClientError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ClientError::validation(
                "username",
                "username must not be empty",
            ));
        }

        self.teardown().await;
        self.store.set_active_username(username).await?;
        *self.active_username.write().await = Some(username.to_string());

        let cached = self.registry.hydrate(username).await?;
        info!(
            "logged in as {} with {} cached conversations",
            username,
            cached.len()
        );

        match self.registry.refresh(username).await {
            Ok(fresh) => Ok(fresh),
            Err(ClientError::Network(err)) => {
                warn!("initial refresh failed, serving cached view: {}", err);
                Ok(cached)
            }
            Err(err) => Err(err),
        }
    }

    /// Re-establish the session persisted by a previous run.
    ///
    /// Returns `None` when no session was saved.
    pub async fn restore(&self) -> Result<Option<Vec<Conversation>>, ClientError> {
        match self.store.active_username().await? {
            Some(username) => self.login(&username).await.map(Some),
            None => Ok(None),
        }
    }

    /// End the active session and purge the account's cached data.
    ///
    /// In-flight operations from this session are fenced out and their
    /// completions discarded. No-op when nobody is logged in.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(username) = self.active_username.write().await.take() else {
            return Ok(());
        };

        self.registry.clear().await;
        self.store.purge_username(&username).await?;
        self.store.clear_active_username().await?;
        info!("logged out {}", username);
        Ok(())
    }

    /// Refresh the active user's conversations from the backend
    pub async fn refresh(&self) -> Result<Vec<Conversation>, ClientError> {
        let username = self.require_active().await?;
        self.registry.refresh(&username).await
    }

    /// Start a conversation for the active user
    pub async fn start_conversation(&self, topic: &str) -> Result<Conversation, ClientError> {
        let username = self.require_active().await?;
        self.registry.start_conversation(&username, topic).await
    }

    pub async fn active_username(&self) -> Option<String> {
        self.active_username.read().await.clone()
    }

    /// The registry bound to this session
    pub fn registry(&self) -> &Arc<ConversationRegistry> {
        &self.registry
    }

    async fn require_active(&self) -> Result<String, ClientError> {
        self.active_username
            .read()
            .await
            .clone()
            .ok_or(ClientError::NoActiveSession)
    }

    /// Drop in-memory session state without touching the store
    async fn teardown(&self) {
        *self.active_username.write().await = None;
        self.registry.clear().await;
    }
}
