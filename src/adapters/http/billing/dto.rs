//! Wire types for the billing HTTP surface.

use serde::{Deserialize, Serialize};

/// Acknowledgement body returned to the provider for any handled delivery.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    /// Event type echoed back for provider-side log correlation.
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Body returned alongside HTTP 500 so the provider schedules a redelivery.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Entitlement view of a subscriber profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub subscribed: bool,
    pub tier: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub onboarding_completed: bool,
}
