//! Scriptable in-memory gateway for registry and session tests
//!
//! Responses are queued per operation; when no response is queued, the stub
//! synthesizes a plausible acknowledgement. A one-shot gate can hold the next
//! send open so tests can interleave other operations while a request is in
//! flight.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use zaplink::client::gateway::RemoteGateway;
use zaplink::shared::error::NetworkError;
use zaplink::shared::messaging::{
    AttachmentRef, ConversationSummary, MessageReceipt, PaymentStatus, RemoteMessage, SystemType,
};

/// One observed `send_message` call
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub username: String,
    pub conversation_id: Option<String>,
    pub text: String,
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Default)]
struct Script {
    send_results: VecDeque<Result<MessageReceipt, NetworkError>>,
    conversations: Vec<ConversationSummary>,
    conversation_errors: VecDeque<NetworkError>,
    messages: HashMap<String, Vec<RemoteMessage>>,
    message_errors: VecDeque<NetworkError>,
    sent: Vec<SentRecord>,
    webhook_urls: Vec<String>,
    send_gate: Option<Arc<Notify>>,
}

/// In-memory [`RemoteGateway`] with scriptable responses
#[derive(Default)]
pub struct StubGateway {
    script: Mutex<Script>,
    receipt_counter: AtomicU64,
    conversation_list_calls: AtomicU64,
    message_list_calls: AtomicU64,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful acknowledgement for the next send
    pub fn queue_send_ok(
        &self,
        conversation_id: &str,
        message_id: &str,
        timestamp: DateTime<Utc>,
    ) {
        self.script
            .lock()
            .unwrap()
            .send_results
            .push_back(Ok(MessageReceipt {
                conversation_id: conversation_id.to_string(),
                message_id: message_id.to_string(),
                timestamp,
            }));
    }

    /// Queue a failure for the next send
    pub fn queue_send_err(&self, err: NetworkError) {
        self.script.lock().unwrap().send_results.push_back(Err(err));
    }

    /// Replace the conversation listing the backend reports
    pub fn set_conversations(&self, summaries: Vec<ConversationSummary>) {
        self.script.lock().unwrap().conversations = summaries;
    }

    /// Queue a failure for the next conversation listing
    pub fn queue_conversations_err(&self, err: NetworkError) {
        self.script
            .lock()
            .unwrap()
            .conversation_errors
            .push_back(err);
    }

    /// Replace the message history of one conversation
    pub fn set_messages(&self, conversation_id: &str, messages: Vec<RemoteMessage>) {
        self.script
            .lock()
            .unwrap()
            .messages
            .insert(conversation_id.to_string(), messages);
    }

    /// Queue a failure for the next message listing
    pub fn queue_messages_err(&self, err: NetworkError) {
        self.script.lock().unwrap().message_errors.push_back(err);
    }

    /// Hold the next send open until the returned gate is notified
    pub fn gate_next_send(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().unwrap().send_gate = Some(gate.clone());
        gate
    }

    /// Every `send_message` call observed so far
    pub fn sent(&self) -> Vec<SentRecord> {
        self.script.lock().unwrap().sent.clone()
    }

    pub fn send_count(&self) -> usize {
        self.script.lock().unwrap().sent.len()
    }

    pub fn conversation_list_calls(&self) -> u64 {
        self.conversation_list_calls.load(Ordering::SeqCst)
    }

    pub fn message_list_calls(&self) -> u64 {
        self.message_list_calls.load(Ordering::SeqCst)
    }

    pub fn webhook_urls(&self) -> Vec<String> {
        self.script.lock().unwrap().webhook_urls.clone()
    }
}

#[async_trait]
impl RemoteGateway for StubGateway {
    async fn send_message(
        &self,
        username: &str,
        conversation_id: Option<&str>,
        text: &str,
        attachments: &[AttachmentRef],
    ) -> Result<MessageReceipt, NetworkError> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.sent.push(SentRecord {
                username: username.to_string(),
                conversation_id: conversation_id.map(str::to_string),
                text: text.to_string(),
                attachments: attachments.to_vec(),
            });
            script.send_gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let queued = self.script.lock().unwrap().send_results.pop_front();
        match queued {
            Some(result) => result,
            None => {
                let n = self.receipt_counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(MessageReceipt {
                    conversation_id: conversation_id
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("srv-conv-{}", n)),
                    message_id: format!("srv-msg-{}", n),
                    timestamp: Utc::now(),
                })
            }
        }
    }

    async fn list_conversations(
        &self,
        username: &str,
    ) -> Result<Vec<ConversationSummary>, NetworkError> {
        self.conversation_list_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if let Some(err) = script.conversation_errors.pop_front() {
            return Err(err);
        }
        Ok(script
            .conversations
            .iter()
            .filter(|summary| summary.username == username)
            .cloned()
            .collect())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RemoteMessage>, NetworkError> {
        self.message_list_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if let Some(err) = script.message_errors.pop_front() {
            return Err(err);
        }
        Ok(script
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_attachment(
        &self,
        _username: &str,
        _conversation_id: Option<&str>,
        _file_bytes: Vec<u8>,
        file_name: &str,
        file_type: &str,
    ) -> Result<AttachmentRef, NetworkError> {
        Ok(AttachmentRef {
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            remote_url: Some(format!("https://files.example/{}", file_name)),
        })
    }

    async fn register_webhook_endpoint(&self, url: &str) -> Result<(), NetworkError> {
        self.script
            .lock()
            .unwrap()
            .webhook_urls
            .push(url.to_string());
        Ok(())
    }

    async fn report_payment_status(
        &self,
        _username: &str,
        _payment_proof_id: &str,
        _status: PaymentStatus,
        _amount: f64,
        _system_type: SystemType,
    ) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn send_reminder(
        &self,
        _username: &str,
        _message: &str,
        _scheduled_for: DateTime<Utc>,
    ) -> Result<(), NetworkError> {
        Ok(())
    }
}
