//! Content-Signature Reconciliation
//!
//! Optimistic local entities and backend echoes of them carry different
//! identifiers until an acknowledgement ties them together. When remote data
//! arrives without a usable id link, these helpers pair it with local
//! entities by content signature: same author and content, created within a
//! tolerance window. Among several candidates the closest-by-time one wins,
//! with unconfirmed entries taking priority so a confirmation is never lost
//! to an already-acknowledged twin.

use chrono::{DateTime, Utc};

use crate::shared::messaging::{
    Conversation, ConversationSummary, DeliveryState, Message, RemoteMessage, Sender,
};

/// Maximum clock skew between a local entity and its backend echo
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Whether two timestamps fall within the reconciliation tolerance window
pub fn within_tolerance(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_seconds().abs() <= SIGNATURE_TOLERANCE_SECS
}

/// Whether a locally-pending conversation matches a backend summary
pub fn conversation_matches(local: &Conversation, summary: &ConversationSummary) -> bool {
    !local.is_synced()
        && local.username == summary.username
        && local.topic == summary.topic
        && within_tolerance(local.created_at, summary.created_at)
}

/// Pick the pending conversation a backend summary most likely corresponds
/// to, returning its current id
pub fn match_pending_conversation<'a>(
    conversations: impl Iterator<Item = &'a Conversation>,
    summary: &ConversationSummary,
) -> Option<String> {
    conversations
        .filter(|c| conversation_matches(c, summary))
        .min_by_key(|c| (c.created_at - summary.created_at).num_milliseconds().abs())
        .map(|c| c.id.clone())
}

/// Whether an optimistic user message matches a remote echo
pub fn message_matches(local: &Message, remote: &RemoteMessage) -> bool {
    local.sender == Sender::User
        && matches!(
            local.delivery_state,
            DeliveryState::Pending | DeliveryState::Sent
        )
        && local.username == remote.username
        && local.text == remote.text
        && within_tolerance(local.timestamp, remote.timestamp)
}

/// Pick the optimistic message a remote echo most likely corresponds to,
/// returning its index.
///
/// Pending candidates outrank Sent ones so repeated identical texts pair up
/// with the entries still waiting for confirmation.
pub fn match_optimistic_message(messages: &[Message], remote: &RemoteMessage) -> Option<usize> {
    messages
        .iter()
        .enumerate()
        .filter(|(_, m)| message_matches(m, remote))
        .min_by_key(|(_, m)| {
            (
                m.delivery_state != DeliveryState::Pending,
                (m.timestamp - remote.timestamp).num_milliseconds().abs(),
            )
        })
        .map(|(index, _)| index)
}
