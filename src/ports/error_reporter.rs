//! Error reporter port - best-effort sink for acknowledged anomalies.
//!
//! Some webhook outcomes are acknowledged to the provider (HTTP 200) but
//! still need operator attention, e.g. a payment for a customer no local
//! user matches. Those are reported here rather than failing the delivery.

use async_trait::async_trait;

/// Context attached to a reported anomaly.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Short machine-readable category (e.g. "user_resolution_failed").
    pub category: String,
    /// Human-readable description.
    pub message: String,
    /// Stripe event id the anomaly arose from, if any.
    pub event_id: Option<String>,
    /// Provider customer id involved, if any.
    pub customer_id: Option<String>,
}

impl ErrorContext {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
            event_id: None,
            customer_id: None,
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

/// Port for reporting anomalies out of band.
///
/// Infallible by contract: implementations swallow their own failures.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Report an anomaly. Never fails the caller.
    async fn report(&self, context: &ErrorContext);
}
