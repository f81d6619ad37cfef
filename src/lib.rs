// Increase recursion limit for complex async operations
#![recursion_limit = "256"]

//! ZapLink - Main Library
//!
//! ZapLink is the conversation synchronization core for a WhatsApp-style
//! support messaging client. It keeps a local, offline-capable view of a
//! user's support conversations consistent with a remote messaging backend
//! under optimistic writes, concurrent refreshes, and out-of-order webhook
//! deliveries.
//!
//! # Overview
//!
//! This library provides the core functionality for ZapLink, including:
//! - Optimistic conversation and message creation with canonical-id adoption
//! - A total message order that every merge path preserves
//! - Idempotent ingestion of backend snapshots and webhook deliveries
//! - Offline-first startup from a local SQLite cache
//! - Session lifecycle with strict data isolation between accounts
//!
//! # Module Structure
//!
//! The library is organized into two main modules:
//!
//! - **`shared`** - Types shared by every component
//!   - Messaging domain model and backend wire shapes
//!   - Gateway configuration
//!   - Error types
//!
//! - **`client`** - The synchronization core
//!   - Conversation registry with alias-based identity migration
//!   - Ordered message streams and reconciliation rules
//!   - SQLite cache, HTTP gateway, session lifecycle
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zaplink::client::{ConversationRegistry, LocalStore, SessionContext};
//! use zaplink::client::gateway::HttpGateway;
//! use zaplink::client::ids::UuidIdGenerator;
//! use zaplink::shared::config::GatewayConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let gateway = Arc::new(HttpGateway::new(config));
//! let store = Arc::new(LocalStore::open().await?);
//! let ids = Arc::new(UuidIdGenerator);
//!
//! let registry = Arc::new(ConversationRegistry::new(gateway, store.clone(), ids));
//! let session = SessionContext::new(registry, store);
//!
//! let conversations = session.login("alice").await?;
//! println!("{} conversations", conversations.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Identity Model
//!
//! Conversations and messages are created locally under generated ids and
//! re-keyed to the backend's canonical ids when acknowledgements arrive.
//! Every superseded id keeps resolving to the current entity, so references
//! held across a migration never dangle. The `local_id` minted at creation
//! never changes.
//!
//! # Thread Safety
//!
//! All registry state lives behind `tokio::sync::RwLock` and is mutated only
//! while the write lock is held. Network calls run with the lock released;
//! their completions are re-validated against a session epoch before being
//! applied, so a logout can never be overwritten by a straggling response.
//!
//! # Error Handling
//!
//! The library uses Rust's standard error handling:
//!
//! - `Result<T, E>` for fallible operations
//! - `Option<T>` for optional values
//! - Custom error types in `shared::error`
/// Shared types and data structures
pub mod shared;

/// Client-side synchronization core
pub mod client;
