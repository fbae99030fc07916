//! Payment provider port - Stripe API lookups.
//!
//! The reconciler only reads from the provider: customer records feed the
//! email bridge and the welcome email recipient. All mutation flows arrive
//! through webhooks.

use async_trait::async_trait;
use thiserror::Error;

/// A customer record fetched from the provider.
#[derive(Debug, Clone)]
pub struct ProviderCustomer {
    /// Provider customer id (cus_xxx).
    pub id: String,
    /// Email on the customer record, if set.
    pub email: Option<String>,
    /// Display name, if set.
    pub name: Option<String>,
}

/// Errors from provider API calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Port for payment provider lookups.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch a customer record by provider customer id.
    ///
    /// Returns `None` for deleted or unknown customers.
    async fn get_customer(&self, customer_id: &str)
        -> Result<Option<ProviderCustomer>, ProviderError>;
}
