//! Client Module
//!
//! This module contains the client-side synchronization core: the
//! conversation registry, the ordered message stream, the local SQLite
//! cache, and the HTTP gateway to the messaging backend.
//!
//! # Architecture
//!
//! The client is organized into focused submodules:
//!
//! - **`registry`** - Conversation registry and reconciliation rules
//! - **`stream`** - Ordered, deduplicated per-conversation message log
//! - **`store`** - Local SQLite persistence for offline-first startup
//! - **`gateway`** - HTTP gateway trait and reqwest implementation
//! - **`session`** - Active-account lifecycle (login, restore, logout)
//! - **`retry`** - Backoff policy for idempotent read operations
//! - **`ids`** - Local identifier generation
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs       - Module exports and documentation
//! ├── registry/    - Conversation registry and reconciliation
//! ├── stream.rs    - Ordered message stream
//! ├── store/       - SQLite cache
//! ├── gateway.rs   - Remote gateway
//! ├── session.rs   - Session lifecycle
//! ├── retry.rs     - Retry policy
//! └── ids.rs       - Id generation
//! ```

pub mod gateway;
pub mod ids;
pub mod registry;
pub mod retry;
pub mod session;
pub mod store;
pub mod stream;

/// Re-export the types most embedders need
pub use gateway::{HttpGateway, RemoteGateway};
pub use ids::{IdGenerator, UuidIdGenerator};
pub use registry::ConversationRegistry;
pub use retry::RetryPolicy;
pub use session::SessionContext;
pub use store::LocalStore;
pub use stream::{IngestOutcome, MessageStream};
