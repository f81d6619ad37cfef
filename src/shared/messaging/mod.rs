//! Messaging Module
//!
//! This module contains the data structures for the messaging domain:
//!
//! - `Conversation` - a support conversation tracked by the client
//! - `Message` - a message in a conversation, with delivery lifecycle
//! - `RemoteMessage` / `ConversationSummary` - backend wire shapes
//! - `MessageReceipt` - backend acknowledgement of a sent message
//! - `PaymentStatus` / `SystemType` - payment side-channel enums
//!
//! # Usage
//!
//! ```rust
//! use zaplink::shared::messaging::{Conversation, Message, DeliveryState};
//! ```

pub mod conversation;
pub mod message;
pub mod payment;

// Re-export all types
pub use conversation::{
    Conversation, ConversationSummary, ConversationSyncState, ListConversationsResponse,
};
pub use message::{
    AttachmentRef, DeliveryState, ListMessagesResponse, Message, MessageReceipt,
    RegisterWebhookRequest, RemoteMessage, SendMessageRequest, Sender, UploadResponse,
};
pub use payment::{
    PaymentStatus, PaymentStatusRequest, ReminderRequest, SystemType, REMINDER_TYPE_RENEWAL,
};
