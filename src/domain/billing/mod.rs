//! Billing domain: webhook events, entitlement projection, dunning.

mod dunning;
mod entitlement;
mod errors;
mod notification;
mod profile;
mod stripe_event;
mod tier;
mod webhook_verifier;

pub use dunning::{DunningRecord, EscalationStage};
pub use entitlement::{Entitlement, EntitlementUpdate, ProviderStatus};
pub use errors::WebhookError;
pub use notification::{Notification, NotificationKind};
pub use profile::SubscriberProfile;
pub use stripe_event::{InvoiceObject, StripeEvent, StripeEventType, SubscriptionObject};
pub use tier::{PriceCatalog, Tier};
pub use webhook_verifier::StripeWebhookVerifier;

#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
