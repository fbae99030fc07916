//! Auth service configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Auth service configuration
///
/// The auth service owns user identities; the billing service only
/// queries its admin API to bridge Stripe customers to users by email.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the auth service
    pub base_url: String,

    /// Service role key for the admin API
    pub service_key: String,
}

impl AuthConfig {
    /// Validate auth configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_BASE_URL"));
        }
        if self.service_key.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_SERVICE_KEY"));
        }
        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::AuthUrlMustBeHttps);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_missing_base_url() {
        let config = AuthConfig::default();
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_validation_http_allowed_in_development() {
        let config = AuthConfig {
            base_url: "http://localhost:9999".to_string(),
            service_key: "service-key".to_string(),
        };
        assert!(config.validate(&Environment::Development).is_ok());
    }

    #[test]
    fn test_validation_requires_https_in_production() {
        let config = AuthConfig {
            base_url: "http://auth.sparkhub.co.uk".to_string(),
            service_key: "service-key".to_string(),
        };
        assert!(config.validate(&Environment::Production).is_err());
    }

    #[test]
    fn test_validation_valid_production_config() {
        let config = AuthConfig {
            base_url: "https://auth.sparkhub.co.uk".to_string(),
            service_key: "service-key".to_string(),
        };
        assert!(config.validate(&Environment::Production).is_ok());
    }
}
