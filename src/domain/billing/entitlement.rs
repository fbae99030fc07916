//! Entitlement state projected from provider subscription status.
//!
//! The entitlement is a tagged state rather than independently-mutated
//! boolean/tier/date fields, so the status-mapping and transition properties
//! can be checked mechanically.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::tier::Tier;

/// Subscription status as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Active,
    Trialing,
    /// Payment retry pending. Deliberately still entitled: access is revoked
    /// only when the provider gives up or the user cancels.
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    Unknown,
}

impl ProviderStatus {
    /// Parse the provider's status string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }

    /// Whether this status grants entitlement.
    pub fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::PastDue)
    }
}

/// A user's entitlement to paid features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Entitlement {
    /// No access to paid features.
    Inactive,
    /// Access granted until `expires_at` for the given tier.
    Active { tier: Tier, expires_at: Timestamp },
}

impl Entitlement {
    /// Projects a provider status onto an entitlement.
    pub fn project(status: ProviderStatus, tier: Tier, period_end: Timestamp) -> Self {
        if status.is_entitled() {
            Entitlement::Active {
                tier,
                expires_at: period_end,
            }
        } else {
            Entitlement::Inactive
        }
    }

    /// True when the entitlement grants access.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Entitlement::Active { .. })
    }

    /// The tier, when active.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Entitlement::Active { tier, .. } => Some(*tier),
            Entitlement::Inactive => None,
        }
    }

    /// The expiry, when active.
    pub fn expires_at(&self) -> Option<Timestamp> {
        match self {
            Entitlement::Active { expires_at, .. } => Some(*expires_at),
            Entitlement::Inactive => None,
        }
    }
}

/// The full projection written for one subscription event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementUpdate {
    pub entitlement: Entitlement,
    pub period_start: Option<Timestamp>,
    pub period_end: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ENTITLED: [ProviderStatus; 3] = [
        ProviderStatus::Active,
        ProviderStatus::Trialing,
        ProviderStatus::PastDue,
    ];

    const NOT_ENTITLED: [ProviderStatus; 6] = [
        ProviderStatus::Canceled,
        ProviderStatus::Unpaid,
        ProviderStatus::Incomplete,
        ProviderStatus::IncompleteExpired,
        ProviderStatus::Paused,
        ProviderStatus::Unknown,
    ];

    #[test]
    fn entitled_statuses_project_to_active() {
        let end = Timestamp::from_unix_secs(1706745600);
        for status in ENTITLED {
            let e = Entitlement::project(status, Tier::Electrician, end);
            assert!(e.is_subscribed(), "{:?} should be entitled", status);
            assert_eq!(e.tier(), Some(Tier::Electrician));
            assert_eq!(e.expires_at(), Some(end));
        }
    }

    #[test]
    fn other_statuses_project_to_inactive() {
        let end = Timestamp::from_unix_secs(1706745600);
        for status in NOT_ENTITLED {
            let e = Entitlement::project(status, Tier::Electrician, end);
            assert!(!e.is_subscribed(), "{:?} should not be entitled", status);
            assert_eq!(e.tier(), None);
        }
    }

    #[test]
    fn status_parsing_covers_provider_strings() {
        assert_eq!(ProviderStatus::from_str("active"), ProviderStatus::Active);
        assert_eq!(ProviderStatus::from_str("trialing"), ProviderStatus::Trialing);
        assert_eq!(ProviderStatus::from_str("past_due"), ProviderStatus::PastDue);
        assert_eq!(ProviderStatus::from_str("canceled"), ProviderStatus::Canceled);
        assert_eq!(ProviderStatus::from_str("unpaid"), ProviderStatus::Unpaid);
        assert_eq!(
            ProviderStatus::from_str("incomplete_expired"),
            ProviderStatus::IncompleteExpired
        );
        assert_eq!(ProviderStatus::from_str("whatever"), ProviderStatus::Unknown);
    }

    #[test]
    fn unknown_tier_still_grants_entitlement() {
        let e = Entitlement::project(
            ProviderStatus::Active,
            Tier::Unknown,
            Timestamp::from_unix_secs(1706745600),
        );
        assert!(e.is_subscribed());
        assert_eq!(e.tier(), Some(Tier::Unknown));
    }

    proptest! {
        /// An active entitlement always carries a tier; an inactive one never does.
        #[test]
        fn projection_never_leaves_entitlement_half_set(status in any::<String>()) {
            let parsed = ProviderStatus::from_str(&status);
            let e = Entitlement::project(
                parsed,
                Tier::Apprentice,
                Timestamp::from_unix_secs(1706745600),
            );
            prop_assert_eq!(e.is_subscribed(), parsed.is_entitled());
            prop_assert_eq!(e.tier().is_some(), e.is_subscribed());
        }
    }
}
