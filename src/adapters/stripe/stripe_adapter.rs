//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API. The
//! reconciler only reads customer records, so the surface is deliberately
//! small.
//!
//! # Security
//!
//! Secrets are handled via `secrecy::SecretString` so they never appear in
//! debug output or logs.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::ports::{PaymentProvider, ProviderCustomer, ProviderError};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Per-request timeout.
    request_timeout: Duration,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

/// Customer shape from Stripe's API. Deleted customers come back as a
/// tombstone with `deleted: true`.
#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    deleted: bool,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderCustomer>, ProviderError> {
        let url = format!("{}/v1/customers/{}", self.config.api_base_url, customer_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message });
        }

        let customer: StripeCustomer = response
            .json()
            .await
            .map_err(|e| ProviderError::Request(format!("Failed to parse response: {}", e)))?;

        if customer.deleted {
            return Ok(None);
        }

        Ok(Some(ProviderCustomer {
            id: customer.id,
            email: customer.email,
            name: customer.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_tombstone_deserializes() {
        let customer: StripeCustomer =
            serde_json::from_str(r#"{"id": "cus_1", "deleted": true}"#).unwrap();
        assert!(customer.deleted);
        assert!(customer.email.is_none());
    }

    #[test]
    fn full_customer_deserializes() {
        let customer: StripeCustomer = serde_json::from_str(
            r#"{"id": "cus_1", "email": "spark@example.co.uk", "name": "Spark", "object": "customer"}"#,
        )
        .unwrap();
        assert!(!customer.deleted);
        assert_eq!(customer.email.as_deref(), Some("spark@example.co.uk"));
    }

    #[test]
    fn config_does_not_leak_key_in_debug() {
        let config = StripeConfig::new("sk_test_secret");
        // SecretString redacts its contents.
        let debug = format!("{:?}", config.api_key);
        assert!(!debug.contains("sk_test_secret"));
    }
}
