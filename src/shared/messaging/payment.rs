//! Payment and Reminder Wire Types
//!
//! Side-channel notifications the client pushes to the backend: payment
//! verification outcomes and renewal reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reminder category reported to the backend
pub const REMINDER_TYPE_RENEWAL: &str = "renewal";

/// Verification outcome for a submitted payment proof
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

/// Subscription system a payment belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemType {
    Iptv,
    P2p,
}

impl SystemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemType::Iptv => "IPTV",
            SystemType::P2p => "P2P",
        }
    }
}

/// Request body for reporting a payment verification outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    pub username: String,
    pub payment_proof_id: String,
    pub status: PaymentStatus,
    pub amount: f64,
    pub system_type: SystemType,
}

/// Request body for scheduling a renewal reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub username: String,
    pub message: String,
    pub scheduled_for: DateTime<Utc>,
    pub reminder_type: String,
    pub app_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(PaymentStatus::Verified).unwrap(),
            serde_json::json!("verified")
        );
        assert_eq!(
            serde_json::to_value(PaymentStatus::Rejected).unwrap(),
            serde_json::json!("rejected")
        );
    }

    #[test]
    fn test_system_type_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(SystemType::Iptv).unwrap(),
            serde_json::json!("IPTV")
        );
        assert_eq!(
            serde_json::to_value(SystemType::P2p).unwrap(),
            serde_json::json!("P2P")
        );
    }

    #[test]
    fn test_payment_request_wire_shape() {
        let request = PaymentStatusRequest {
            username: "alice".to_string(),
            payment_proof_id: "proof-1".to_string(),
            status: PaymentStatus::Verified,
            amount: 49.9,
            system_type: SystemType::Iptv,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["paymentProofId"], "proof-1");
        assert_eq!(value["systemType"], "IPTV");
        assert_eq!(value["status"], "verified");
    }
}
