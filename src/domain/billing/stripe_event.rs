//! Stripe webhook event envelope and payload objects.
//!
//! Only the fields the reconciler reads are captured; everything else in
//! Stripe's event schema is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::WebhookError;

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "invoice.payment_failed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only on update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl StripeEvent {
    /// Parses a raw webhook body into an event envelope.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    /// Parses the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::from_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    /// Returns `previous_attributes.status` if present on an update event.
    pub fn previous_status(&self) -> Option<&str> {
        self.data
            .previous_attributes
            .as_ref()
            .and_then(|attrs| attrs.get("status"))
            .and_then(|v| v.as_str())
    }
}

/// Event types the reconciler dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    /// Customer subscription was created.
    SubscriptionCreated,
    /// Customer subscription was updated.
    SubscriptionUpdated,
    /// Customer subscription was deleted (terminal).
    SubscriptionDeleted,
    /// Invoice paid successfully.
    InvoicePaid,
    /// Invoice payment failed.
    InvoicePaymentFailed,
    /// Unknown or unhandled event type.
    Unknown,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Subscription object carried by `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    /// Provider subscription id (sub_xxx).
    pub id: String,

    /// Provider customer id (cus_xxx).
    pub customer: String,

    /// Provider status string (active, past_due, canceled, ...).
    pub status: String,

    /// Current billing period start (Unix timestamp).
    #[serde(default)]
    pub current_period_start: i64,

    /// Current billing period end (Unix timestamp).
    #[serde(default)]
    pub current_period_end: i64,

    /// Metadata set at subscription creation (may carry the local user id).
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Subscription line items (first item's price identifies the plan).
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl SubscriptionObject {
    /// Returns the local user id hint from metadata, if present.
    pub fn user_id_hint(&self) -> Option<&str> {
        self.metadata
            .get("user_id")
            .or_else(|| self.metadata.get("userId"))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Returns the price id of the first line item.
    pub fn primary_price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

/// Line item container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// A single subscription line item.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: SubscriptionPrice,
}

/// Price reference on a line item.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPrice {
    pub id: String,
}

/// Invoice object carried by `invoice.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    /// Provider invoice id (in_xxx) - the dunning idempotency key.
    pub id: String,

    /// Provider customer id.
    pub customer: String,

    /// Parent subscription id, if the invoice belongs to one.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Amount due in the smallest currency unit (pence).
    #[serde(default)]
    pub amount_due: i64,

    /// Hosted payment page URL (snapshot at failure time).
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,

    /// Customer email as rendered on the invoice.
    #[serde(default)]
    pub customer_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subscription_event_json() -> String {
        json!({
            "id": "evt_sub_1",
            "type": "customer.subscription.updated",
            "created": 1704067200,
            "livemode": false,
            "data": {
                "object": {
                    "id": "sub_123",
                    "customer": "cus_456",
                    "status": "active",
                    "current_period_start": 1704067200,
                    "current_period_end": 1706745600,
                    "metadata": {"user_id": "u-1"},
                    "items": {"data": [{"price": {"id": "price_electrician_monthly"}}]}
                },
                "previous_attributes": {"status": "past_due"}
            }
        })
        .to_string()
    }

    #[test]
    fn parse_subscription_event() {
        let event = StripeEvent::parse(subscription_event_json().as_bytes()).unwrap();

        assert_eq!(event.id, "evt_sub_1");
        assert_eq!(event.parsed_type(), StripeEventType::SubscriptionUpdated);
        assert_eq!(event.previous_status(), Some("past_due"));

        let sub: SubscriptionObject = event.deserialize_object().unwrap();
        assert_eq!(sub.id, "sub_123");
        assert_eq!(sub.customer, "cus_456");
        assert_eq!(sub.user_id_hint(), Some("u-1"));
        assert_eq!(sub.primary_price_id(), Some("price_electrician_monthly"));
    }

    #[test]
    fn parse_invoice_event() {
        let body = json!({
            "id": "evt_inv_1",
            "type": "invoice.payment_failed",
            "data": {
                "object": {
                    "id": "in_001",
                    "customer": "cus_456",
                    "subscription": "sub_123",
                    "amount_due": 999,
                    "hosted_invoice_url": "https://pay.stripe.com/in_001",
                    "customer_email": "spark@example.co.uk"
                }
            }
        })
        .to_string();

        let event = StripeEvent::parse(body.as_bytes()).unwrap();
        assert_eq!(event.parsed_type(), StripeEventType::InvoicePaymentFailed);
        assert_eq!(event.created, 0);

        let invoice: InvoiceObject = event.deserialize_object().unwrap();
        assert_eq!(invoice.id, "in_001");
        assert_eq!(invoice.amount_due, 999);
        assert_eq!(invoice.subscription.as_deref(), Some("sub_123"));
        assert_eq!(invoice.customer_email.as_deref(), Some("spark@example.co.uk"));
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let result = StripeEvent::parse(b"not json");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn event_type_roundtrip() {
        let types = [
            StripeEventType::SubscriptionCreated,
            StripeEventType::SubscriptionUpdated,
            StripeEventType::SubscriptionDeleted,
            StripeEventType::InvoicePaid,
            StripeEventType::InvoicePaymentFailed,
        ];
        for event_type in types {
            assert_eq!(StripeEventType::from_str(event_type.as_str()), event_type);
        }
    }

    #[test]
    fn unknown_event_type_maps_to_unknown() {
        assert_eq!(
            StripeEventType::from_str("charge.refunded"),
            StripeEventType::Unknown
        );
    }

    #[test]
    fn user_id_hint_accepts_camel_case_key() {
        let sub: SubscriptionObject = serde_json::from_value(json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "metadata": {"userId": "u-9"}
        }))
        .unwrap();
        assert_eq!(sub.user_id_hint(), Some("u-9"));
    }

    #[test]
    fn user_id_hint_ignores_empty_value() {
        let sub: SubscriptionObject = serde_json::from_value(json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "metadata": {"user_id": ""}
        }))
        .unwrap();
        assert_eq!(sub.user_id_hint(), None);
    }

    #[test]
    fn missing_items_defaults_to_no_price() {
        let sub: SubscriptionObject = serde_json::from_value(json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active"
        }))
        .unwrap();
        assert_eq!(sub.primary_price_id(), None);
    }
}
