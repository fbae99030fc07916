//! Notification store port - in-app notification inserts.

use async_trait::async_trait;

use crate::domain::billing::Notification;
use crate::domain::foundation::DomainError;

/// Port for persisting user-facing notifications.
///
/// Inserts are best-effort from the reconciler's perspective: a failure is
/// logged and never blocks entitlement processing.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a notification row.
    async fn insert(&self, notification: &Notification) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn NotificationStore) {}
    }
}
