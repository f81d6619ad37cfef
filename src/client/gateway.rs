//! Remote Messaging Gateway
//!
//! This module wraps the IA-Zap HTTP API behind the [`RemoteGateway`] trait.
//!
//! # Endpoints
//!
//! - `POST /messages/send` - send a message, returns a receipt with canonical ids
//! - `GET  /conversations/{username}` - list a user's conversations
//! - `GET  /conversations/{id}/messages` - list messages of a conversation
//! - `POST /upload` - multipart attachment upload
//! - `POST /webhooks` - register an inbound delivery endpoint
//! - `PUT  /payments/status` - report a payment verification outcome
//! - `POST /reminders/send` - schedule a renewal reminder
//!
//! All failures are reported as typed [`NetworkError`] values; the gateway
//! never panics on backend behavior and never retries on its own. Retry
//! decisions belong to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::shared::config::GatewayConfig;
use crate::shared::error::{MalformedPayloadError, NetworkError};
use crate::shared::messaging::{
    AttachmentRef, ConversationSummary, ListConversationsResponse, ListMessagesResponse,
    MessageReceipt, PaymentStatus, PaymentStatusRequest, RegisterWebhookRequest, ReminderRequest,
    RemoteMessage, SendMessageRequest, SystemType, UploadResponse, REMINDER_TYPE_RENEWAL,
};

/// Webhook event names the client subscribes to
pub const WEBHOOK_EVENTS: [&str; 2] = ["message.received", "message.sent"];

/// Operations the sync core needs from the remote messaging backend.
///
/// Implementations must be safe to call concurrently. Each method maps to a
/// single request; callers decide about retries and about how failures show
/// up in the UI.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Send a message, creating the conversation backend-side when
    /// `conversation_id` is `None`
    async fn send_message(
        &self,
        username: &str,
        conversation_id: Option<&str>,
        text: &str,
        attachments: &[AttachmentRef],
    ) -> Result<MessageReceipt, NetworkError>;

    /// List the conversations of a user, possibly with embedded messages
    async fn list_conversations(
        &self,
        username: &str,
    ) -> Result<Vec<ConversationSummary>, NetworkError>;

    /// List the messages of a conversation by its canonical id
    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RemoteMessage>, NetworkError>;

    /// Upload a file, returning the backend's reference to it
    async fn upload_attachment(
        &self,
        username: &str,
        conversation_id: Option<&str>,
        file_bytes: Vec<u8>,
        file_name: &str,
        file_type: &str,
    ) -> Result<AttachmentRef, NetworkError>;

    /// Register a URL to receive `message.received` / `message.sent` events
    async fn register_webhook_endpoint(&self, url: &str) -> Result<(), NetworkError>;

    /// Report the verification outcome of a payment proof
    async fn report_payment_status(
        &self,
        username: &str,
        payment_proof_id: &str,
        status: PaymentStatus,
        amount: f64,
        system_type: SystemType,
    ) -> Result<(), NetworkError>;

    /// Schedule a renewal reminder for a user
    async fn send_reminder(
        &self,
        username: &str,
        message: &str,
        scheduled_for: DateTime<Utc>,
    ) -> Result<(), NetworkError>;
}

/// HTTP implementation of [`RemoteGateway`] against the IA-Zap backend
pub struct HttpGateway {
    config: GatewayConfig,
    client: Client,
}

impl HttpGateway {
    /// Create a gateway from connection settings
    pub fn new(config: GatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .expect("failed to build HTTP client");

        Self { config, client }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.auth_token() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    fn map_transport_error(err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout
        } else {
            NetworkError::Unreachable
        }
    }

    fn check_status(response: Response) -> Result<Response, NetworkError> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NetworkError::Unauthorized),
            status if !status.is_success() => {
                warn!("backend answered HTTP {}", status.as_u16());
                Err(NetworkError::ServerError(status.as_u16()))
            }
            _ => Ok(response),
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, NetworkError> {
        let status = response.status();
        response.json::<T>().await.map_err(|err| {
            warn!("failed to decode backend response: {}", err);
            if err.is_timeout() {
                NetworkError::Timeout
            } else {
                NetworkError::ServerError(status.as_u16())
            }
        })
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, NetworkError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(Self::map_transport_error)?;
        Self::check_status(response)
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn send_message(
        &self,
        username: &str,
        conversation_id: Option<&str>,
        text: &str,
        attachments: &[AttachmentRef],
    ) -> Result<MessageReceipt, NetworkError> {
        let url = self.config.endpoint("/messages/send");
        debug!("POST {} (conversation: {:?})", url, conversation_id);

        let body = SendMessageRequest {
            username: username.to_string(),
            conversation_id: conversation_id.map(str::to_string),
            message: text.to_string(),
            attachments: attachments.to_vec(),
            timestamp: Utc::now(),
            app_name: self.config.app_name().to_string(),
            version: self.config.app_version().to_string(),
        };

        let response = self.execute(self.client.post(&url).json(&body)).await?;
        Self::read_json(response).await
    }

    async fn list_conversations(
        &self,
        username: &str,
    ) -> Result<Vec<ConversationSummary>, NetworkError> {
        let url = self.config.endpoint(&format!("/conversations/{}", username));
        debug!("GET {}", url);

        let response = self.execute(self.client.get(&url)).await?;
        let parsed: ListConversationsResponse = Self::read_json(response).await?;
        Ok(parsed.conversations)
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<RemoteMessage>, NetworkError> {
        let url = self
            .config
            .endpoint(&format!("/conversations/{}/messages", conversation_id));
        debug!("GET {}", url);

        let response = self.execute(self.client.get(&url)).await?;
        let parsed: ListMessagesResponse = Self::read_json(response).await?;
        Ok(parsed.messages)
    }

    async fn upload_attachment(
        &self,
        username: &str,
        conversation_id: Option<&str>,
        file_bytes: Vec<u8>,
        file_name: &str,
        file_type: &str,
    ) -> Result<AttachmentRef, NetworkError> {
        let url = self.config.endpoint("/upload");
        debug!("POST {} ({}, {} bytes)", url, file_name, file_bytes.len());

        let mut form = multipart::Form::new()
            .text("username", username.to_string())
            .text("fileName", file_name.to_string())
            .text("fileType", file_type.to_string())
            .part(
                "file",
                multipart::Part::bytes(file_bytes).file_name(file_name.to_string()),
            );
        if let Some(conversation_id) = conversation_id {
            form = form.text("conversationId", conversation_id.to_string());
        }

        let response = self.execute(self.client.post(&url).multipart(form)).await?;
        let parsed: UploadResponse = Self::read_json(response).await?;
        Ok(parsed.attachment_ref)
    }

    async fn register_webhook_endpoint(&self, url: &str) -> Result<(), NetworkError> {
        let endpoint = self.config.endpoint("/webhooks");
        debug!("POST {} (target: {})", endpoint, url);

        let body = RegisterWebhookRequest {
            url: url.to_string(),
            events: WEBHOOK_EVENTS.iter().map(|s| s.to_string()).collect(),
        };

        self.execute(self.client.post(&endpoint).json(&body)).await?;
        Ok(())
    }

    async fn report_payment_status(
        &self,
        username: &str,
        payment_proof_id: &str,
        status: PaymentStatus,
        amount: f64,
        system_type: SystemType,
    ) -> Result<(), NetworkError> {
        let url = self.config.endpoint("/payments/status");
        debug!("PUT {} ({})", url, status.as_str());

        let body = PaymentStatusRequest {
            username: username.to_string(),
            payment_proof_id: payment_proof_id.to_string(),
            status,
            amount,
            system_type,
        };

        self.execute(self.client.put(&url).json(&body)).await?;
        Ok(())
    }

    async fn send_reminder(
        &self,
        username: &str,
        message: &str,
        scheduled_for: DateTime<Utc>,
    ) -> Result<(), NetworkError> {
        let url = self.config.endpoint("/reminders/send");
        debug!("POST {} (for: {})", url, scheduled_for);

        let body = ReminderRequest {
            username: username.to_string(),
            message: message.to_string(),
            scheduled_for,
            reminder_type: REMINDER_TYPE_RENEWAL.to_string(),
            app_name: self.config.app_name().to_string(),
        };

        self.execute(self.client.post(&url).json(&body)).await?;
        Ok(())
    }
}

/// Parse and validate an inbound webhook payload.
///
/// Payloads must be JSON carrying at least a non-empty `username`, a
/// non-empty `message` body and a `conversationId`. Anything else is rejected
/// so the ingestion path can drop it with a log line instead of panicking.
pub fn parse_webhook_payload(raw: &str) -> Result<RemoteMessage, MalformedPayloadError> {
    let remote: RemoteMessage = serde_json::from_str(raw)
        .map_err(|err| MalformedPayloadError::new(format!("invalid JSON: {}", err)))?;

    if remote.username.trim().is_empty() {
        return Err(MalformedPayloadError::new("missing username"));
    }
    if remote.text.trim().is_empty() {
        return Err(MalformedPayloadError::new("missing message text"));
    }
    match remote.conversation_id.as_deref() {
        Some(id) if !id.trim().is_empty() => {}
        _ => return Err(MalformedPayloadError::new("missing conversationId")),
    }

    Ok(remote)
}
