//! Email sender port - transactional email delivery.

use async_trait::async_trait;

use crate::domain::billing::Tier;
use crate::domain::foundation::DomainError;

/// Port for sending reconciler emails.
///
/// Delivery is best-effort: send failures are logged and never fail the
/// webhook, but the dunning counter still advances so a flaky provider
/// cannot cause duplicate escalations on redelivery.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send the one-time welcome email for a newly activated subscription.
    async fn send_welcome(&self, to: &str, tier: Tier) -> Result<(), DomainError>;

    /// Send the payment-failed notice with the hosted payment URL.
    ///
    /// `amount_due` is in the smallest currency unit (pence).
    async fn send_payment_failed(
        &self,
        to: &str,
        amount_due: i64,
        hosted_invoice_url: Option<&str>,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_sender_is_object_safe() {
        fn _accepts_dyn(_sender: &dyn EmailSender) {}
    }
}
