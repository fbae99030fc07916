//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `SubscriberProfileRepository` - entitlement projection persistence
//! - `DunningRepository` - per-invoice payment-failure tracking
//! - `PaymentProvider` - Stripe API lookups (customer records)
//! - `UserDirectory` - email to local user id resolution
//! - `NotificationStore` - in-app notification inserts
//! - `EmailSender` - transactional email delivery
//! - `ErrorReporter` - best-effort error sink for acknowledged anomalies

mod dunning_repository;
mod email_sender;
mod error_reporter;
mod notification_store;
mod payment_provider;
mod profile_repository;
mod user_directory;

pub use dunning_repository::{DunningRepository, SaveResult};
pub use email_sender::EmailSender;
pub use error_reporter::{ErrorContext, ErrorReporter};
pub use notification_store::NotificationStore;
pub use payment_provider::{PaymentProvider, ProviderCustomer, ProviderError};
pub use profile_repository::SubscriberProfileRepository;
pub use user_directory::UserDirectory;
