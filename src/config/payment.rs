//! Payment configuration

use std::collections::HashMap;

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::{PriceCatalog, Tier};

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret.
    ///
    /// Optional: when absent, webhook signatures are not verified and
    /// events are processed as unverified. Set this in any deployment
    /// that receives real Stripe traffic.
    pub stripe_webhook_secret: Option<String>,

    /// JSON object mapping Stripe price ids to tier names,
    /// e.g. `{"price_123":"apprentice","price_456":"electrician"}`
    #[serde(default = "default_price_map")]
    pub price_map: String,

    /// Version number for the price map, surfaced in logs
    #[serde(default = "default_catalog_version")]
    pub catalog_version: u32,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Build the price catalog from the configured map
    pub fn price_catalog(&self) -> Result<PriceCatalog, ValidationError> {
        let raw: HashMap<String, String> = serde_json::from_str(&self.price_map)
            .map_err(|e| ValidationError::InvalidPriceMap(e.to_string()))?;

        Ok(PriceCatalog::from_entries(
            self.catalog_version,
            raw.into_iter()
                .map(|(price_id, tier)| (price_id, Tier::from_str(&tier))),
        ))
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if let Some(secret) = &self.stripe_webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }

        self.price_catalog()?;

        Ok(())
    }
}

fn default_price_map() -> String {
    "{}".to_string()
}

fn default_catalog_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_test_mode() {
        let config = PaymentConfig {
            stripe_api_key: "sk_test_xxx".to_string(),
            ..Default::default()
        };
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_is_live_mode() {
        let config = PaymentConfig {
            stripe_api_key: "sk_live_xxx".to_string(),
            ..Default::default()
        };
        assert!(config.is_live_mode());
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = PaymentConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_api_key_prefix() {
        let config = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(), // Wrong prefix
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = PaymentConfig {
            stripe_api_key: "sk_test_xxx".to_string(),
            stripe_webhook_secret: Some("secret_xxx".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_missing_webhook_secret_is_allowed() {
        let config = PaymentConfig {
            stripe_api_key: "sk_test_xxx".to_string(),
            stripe_webhook_secret: None,
            price_map: default_price_map(),
            catalog_version: 1,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_price_catalog_parses_map() {
        let config = PaymentConfig {
            stripe_api_key: "sk_test_xxx".to_string(),
            price_map: r#"{"price_a":"apprentice","price_e":"electrician"}"#.to_string(),
            catalog_version: 4,
            ..Default::default()
        };
        let catalog = config.price_catalog().unwrap();
        assert_eq!(catalog.version(), 4);
        assert_eq!(catalog.resolve(Some("price_a")), Tier::Apprentice);
        assert_eq!(catalog.resolve(Some("price_e")), Tier::Electrician);
    }

    #[test]
    fn test_price_catalog_unrecognized_tier_is_unknown() {
        let config = PaymentConfig {
            stripe_api_key: "sk_test_xxx".to_string(),
            price_map: r#"{"price_x":"platinum"}"#.to_string(),
            ..Default::default()
        };
        let catalog = config.price_catalog().unwrap();
        assert_eq!(catalog.resolve(Some("price_x")), Tier::Unknown);
    }

    #[test]
    fn test_validation_malformed_price_map() {
        let config = PaymentConfig {
            stripe_api_key: "sk_test_xxx".to_string(),
            price_map: "not-json".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
