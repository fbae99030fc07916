//! Webhook error taxonomy.

use thiserror::Error;

/// Errors that occur during webhook processing.
///
/// Signature failures are handled inside the intake step (degrade to
/// unverified processing) and never surface from the reconciler; any error
/// that does escape is the "unexpected" class that answers HTTP 500 and
/// triggers provider redelivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is older than the replay window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signature timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the signature header or event payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Datastore operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Payment provider API call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// True for failures of the signature verification step, which degrade
    /// to unverified processing rather than failing the event.
    pub fn is_signature_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }
}

impl From<crate::domain::foundation::DomainError> for WebhookError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
