//! Dunning repository port - per-invoice payment-failure tracking.
//!
//! Stripe may deliver the same `invoice.payment_failed` event multiple
//! times. Implementations must make `insert` race-safe (database unique
//! constraint with insert-if-absent semantics) so concurrent deliveries of
//! the same invoice agree on a single tracking row.

use async_trait::async_trait;

use crate::domain::billing::DunningRecord;
use crate::domain::foundation::{DomainError, Timestamp};

/// Result of attempting to insert a dunning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first failure seen for this invoice).
    Inserted,
    /// An unresolved record already exists for this invoice.
    AlreadyExists,
}

/// Port for dunning record persistence.
#[async_trait]
pub trait DunningRepository: Send + Sync {
    /// Find the unresolved tracking record for an invoice.
    ///
    /// Returns `None` when the invoice is untracked or already resolved.
    async fn find_unresolved_by_invoice_id(
        &self,
        invoice_id: &str,
    ) -> Result<Option<DunningRecord>, DomainError>;

    /// Insert a tracking record if no unresolved one exists for the invoice.
    ///
    /// Uses insert-if-absent semantics: returns `SaveResult::AlreadyExists`
    /// when another delivery won the race.
    async fn insert(&self, record: &DunningRecord) -> Result<SaveResult, DomainError>;

    /// Increment the escalation email counter for an invoice.
    async fn record_email_sent(&self, invoice_id: &str) -> Result<(), DomainError>;

    /// Resolve the unresolved record for an invoice, if one exists.
    ///
    /// Returns the record as it stood before resolution, or `None` if the
    /// invoice was untracked or already resolved. Idempotent.
    async fn resolve_by_invoice_id(
        &self,
        invoice_id: &str,
        at: Timestamp,
    ) -> Result<Option<DunningRecord>, DomainError>;

    /// Resolve every unresolved record under a subscription.
    ///
    /// Used on subscription cancellation. Returns the number of records
    /// resolved.
    async fn resolve_by_subscription_id(
        &self,
        subscription_id: &str,
        at: Timestamp,
    ) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dunning_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn DunningRepository) {}
    }
}
