//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Deterministic timestamp fixtures
//! - A scriptable in-memory gateway stub
//! - Tracing initialization

#![allow(dead_code)]

pub mod stub_gateway;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use zaplink::client::ids::SequenceIdGenerator;
use zaplink::client::registry::ConversationRegistry;
use zaplink::client::retry::RetryPolicy;
use zaplink::client::store::LocalStore;
use zaplink::shared::messaging::{ConversationSummary, RemoteMessage};

use stub_gateway::StubGateway;

/// Initialize tracing once per test binary; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zaplink=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Fixed base instant for deterministic ordering
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

/// `base_time` shifted by whole seconds
pub fn ts(seconds: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::seconds(seconds)
}

/// Retry policy with negligible delays so failure paths stay fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)).with_jitter(0.0)
}

/// A backend-reported message fixture
pub fn remote_message(
    id: Option<&str>,
    username: &str,
    text: &str,
    conversation_id: Option<&str>,
    timestamp: DateTime<Utc>,
) -> RemoteMessage {
    RemoteMessage {
        id: id.map(str::to_string),
        username: username.to_string(),
        text: text.to_string(),
        conversation_id: conversation_id.map(str::to_string),
        timestamp,
        sender: None,
        attachments: Vec::new(),
    }
}

/// A backend conversation summary fixture without embedded messages
pub fn summary(
    id: &str,
    username: &str,
    topic: &str,
    created_at: DateTime<Utc>,
) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        username: username.to_string(),
        topic: topic.to_string(),
        created_at,
        messages: Vec::new(),
    }
}

/// A raw webhook delivery body as the backend posts it
pub fn webhook_json(
    id: Option<&str>,
    username: &str,
    text: &str,
    conversation_id: &str,
    timestamp: DateTime<Utc>,
) -> String {
    let mut payload = serde_json::json!({
        "username": username,
        "message": text,
        "conversationId": conversation_id,
        "timestamp": timestamp.to_rfc3339(),
    });
    if let Some(id) = id {
        payload["id"] = serde_json::json!(id);
    }
    payload.to_string()
}

/// Block until the stub has observed `n` send calls
pub async fn wait_for_sends(gateway: &StubGateway, n: usize) {
    for _ in 0..400 {
        if gateway.send_count() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("gateway never saw {} send(s)", n);
}

/// Registry wired to a stub gateway, an in-memory store, and sequential ids
pub struct TestRig {
    pub gateway: Arc<StubGateway>,
    pub store: Arc<LocalStore>,
    pub registry: Arc<ConversationRegistry>,
}

impl TestRig {
    pub async fn new() -> Self {
        init_tracing();
        let gateway = Arc::new(StubGateway::new());
        let store = Arc::new(
            LocalStore::open_in_memory()
                .await
                .expect("in-memory store should open"),
        );
        let ids = Arc::new(SequenceIdGenerator::new("local"));
        let registry = Arc::new(
            ConversationRegistry::new(gateway.clone(), store.clone(), ids)
                .with_retry_policy(fast_retry()),
        );
        Self {
            gateway,
            store,
            registry,
        }
    }
}
