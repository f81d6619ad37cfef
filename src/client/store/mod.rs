//! Local Store
//!
//! SQLite-backed cache of the active user's conversations, messages and
//! session values. The cache survives process restarts and is purged in full
//! on logout.
//!
//! # Features
//!
//! - **Session values**: small key/value table holding the active username
//! - **Conversations**: one row per conversation, keyed by current id
//! - **Messages**: one row per message, keyed by (conversation id, id)
//! - **Id migration**: transactional re-keying when a backend acknowledgement
//!   replaces a local identifier with the canonical one
//!
//! # Usage
//!
//! ```rust,no_run
//! use zaplink::client::store::LocalStore;
//!
//! # async fn example() -> Result<(), sqlx::Error> {
//! let store = LocalStore::open().await?;
//! let conversations = store.conversations_for("alice").await?;
//! # Ok(())
//! # }
//! ```

pub mod conversations;
pub mod messages;
pub mod session;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

/// Result type for store operations
pub type Result<T> = sqlx::Result<T>;

/// SQLite-backed local cache
#[derive(Debug)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open the store at the default per-user data path
    pub async fn open() -> Result<Self> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self::open_at(&path).await
    }

    /// Open the store at an explicit path, creating the file if needed
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        Self::connect(options, 5).await
    }

    /// Open an in-memory store (used by tests)
    pub async fn open_in_memory() -> Result<Self> {
        // A pool would hand every connection its own empty :memory: database,
        // so the in-memory store is pinned to a single connection.
        let options = SqliteConnectOptions::new().in_memory(true);
        Self::connect(options, 1).await
    }

    fn default_path() -> PathBuf {
        let base = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        base.join("zaplink").join("local.db")
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                local_id TEXT NOT NULL,
                username TEXT NOT NULL,
                topic TEXT NOT NULL,
                created_at TEXT NOT NULL,
                sync_state TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                conversation_id TEXT NOT NULL,
                id TEXT NOT NULL,
                local_id TEXT NOT NULL,
                username TEXT NOT NULL,
                text TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                sender TEXT NOT NULL,
                delivery_state TEXT NOT NULL,
                attachments_json TEXT NOT NULL,
                PRIMARY KEY (conversation_id, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Delete every conversation and message belonging to `username`.
    ///
    /// Runs in one transaction; the session table is left untouched.
    pub async fn purge_username(&self, username: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM messages WHERE conversation_id IN \
             (SELECT id FROM conversations WHERE username = ?)",
        )
        .bind(username)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM conversations WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
