//! User-facing notifications emitted by the reconciler.
//!
//! Write-only from the reconciler's perspective; the rest of the platform
//! reads and marks them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// Categories of reconciler-emitted notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    SubscriptionStatusChanged,
    PaymentFailed,
    PaymentRecovered,
}

impl NotificationKind {
    /// Storage string for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::SubscriptionStatusChanged => "subscription_status_changed",
            Self::PaymentFailed => "payment_failed",
            Self::PaymentRecovered => "payment_recovered",
        }
    }
}

/// A notification row to insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_storage_strings_are_stable() {
        assert_eq!(NotificationKind::Welcome.as_str(), "welcome");
        assert_eq!(NotificationKind::PaymentRecovered.as_str(), "payment_recovered");
        assert_eq!(
            NotificationKind::SubscriptionStatusChanged.as_str(),
            "subscription_status_changed"
        );
    }

    #[test]
    fn notification_carries_payload() {
        let n = Notification::new(
            UserId::new("u-1").unwrap(),
            NotificationKind::PaymentFailed,
            "Payment failed",
            "We could not collect your latest payment.",
            serde_json::json!({"invoice_id": "in_001"}),
        );
        assert_eq!(n.payload["invoice_id"], "in_001");
    }
}
