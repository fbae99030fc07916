//! Subscriber profile: the local system of record for entitlement.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::entitlement::Entitlement;

/// A user's subscription profile.
///
/// Created implicitly on first successful identity resolution; mutated only
/// by the reconciler in response to provider events; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    /// Local user id (primary key).
    pub user_id: UserId,

    /// Provider customer id (secondary key, backfilled when learned).
    pub stripe_customer_id: Option<String>,

    /// Current entitlement state.
    pub entitlement: Entitlement,

    /// Start of the current paid period.
    pub subscription_start: Option<Timestamp>,

    /// End of the current paid period.
    pub subscription_end: Option<Timestamp>,

    /// Set true exactly once, on the first successful activation.
    pub onboarding_completed: bool,
}

impl SubscriberProfile {
    /// Creates an empty profile for a newly-resolved user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            stripe_customer_id: None,
            entitlement: Entitlement::Inactive,
            subscription_start: None,
            subscription_end: None,
            onboarding_completed: false,
        }
    }

    /// Convenience accessor matching the flag the rest of the platform reads.
    pub fn subscribed(&self) -> bool {
        self.entitlement.is_subscribed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::Tier;

    #[test]
    fn new_profile_starts_inactive() {
        let p = SubscriberProfile::new(UserId::new("u-1").unwrap());
        assert!(!p.subscribed());
        assert!(p.stripe_customer_id.is_none());
        assert!(!p.onboarding_completed);
    }

    #[test]
    fn active_entitlement_reports_subscribed() {
        let mut p = SubscriberProfile::new(UserId::new("u-1").unwrap());
        p.entitlement = Entitlement::Active {
            tier: Tier::Electrician,
            expires_at: Timestamp::from_unix_secs(1706745600),
        };
        assert!(p.subscribed());
    }
}
