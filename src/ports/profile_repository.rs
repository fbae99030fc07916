//! Subscriber profile repository port (write side).
//!
//! The profile row is the local system of record for entitlement. The
//! reconciler is its only writer.

use async_trait::async_trait;

use crate::domain::billing::{EntitlementUpdate, SubscriberProfile};
use crate::domain::foundation::{DomainError, UserId};

/// Repository port for subscriber profile persistence.
///
/// Implementations must upsert: a user's first subscription event creates
/// the profile row implicitly.
#[async_trait]
pub trait SubscriberProfileRepository: Send + Sync {
    /// Load the full profile for a user.
    ///
    /// Returns `None` when no profile row exists yet. This is the read the
    /// rest of the platform uses to gate access to paid features.
    async fn find_by_user(&self, user_id: &UserId)
        -> Result<Option<SubscriberProfile>, DomainError>;

    /// Find the provider customer id stored for a user.
    ///
    /// Returns `None` if the user has no profile or no mapping yet.
    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError>;

    /// Find the user owning a provider customer id.
    ///
    /// Returns `None` if no profile carries this mapping.
    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, DomainError>;

    /// Store the customer mapping for a user, creating the profile if needed.
    ///
    /// Used by the email bridge to converge future lookups onto the stored
    /// mapping tier.
    async fn backfill_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError>;

    /// Write the entitlement projection for a user, creating the profile if
    /// needed. Last write wins.
    async fn apply_entitlement(
        &self,
        user_id: &UserId,
        customer_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<(), DomainError>;

    /// Set the onboarding flag. Returns true only on the transition from
    /// unset to set, so welcome effects fire exactly once per user.
    async fn mark_onboarded(&self, user_id: &UserId) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriberProfileRepository) {}
    }
}
