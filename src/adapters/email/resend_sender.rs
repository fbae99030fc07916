//! Resend implementation of the EmailSender port.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::billing::Tier;
use crate::domain::foundation::DomainError;
use crate::ports::EmailSender;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Configuration for the Resend adapter.
#[derive(Clone)]
pub struct ResendConfig {
    pub api_key: SecretString,
    /// Formatted From header, e.g. "SparkHub <hello@sparkhub.co.uk>".
    pub from: String,
    /// Override for the API endpoint (for testing).
    pub api_url: String,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from: from.into(),
            api_url: RESEND_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

/// Resend email sender.
pub struct ResendEmailSender {
    config: ResendConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

impl ResendEmailSender {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), DomainError> {
        let request = SendRequest {
            from: &self.config.from,
            to: [to],
            subject,
            html,
        };

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::external_service(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::external_service(format!(
                "Email provider returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

fn tier_display(tier: Tier) -> &'static str {
    match tier {
        Tier::Apprentice => "Apprentice",
        Tier::Electrician => "Electrician",
        Tier::Employer => "Employer",
        Tier::Unknown => "SparkHub",
    }
}

/// Renders pence as a pound amount, e.g. 999 -> "£9.99".
fn format_pence(amount: i64) -> String {
    format!("£{}.{:02}", amount / 100, (amount % 100).abs())
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send_welcome(&self, to: &str, tier: Tier) -> Result<(), DomainError> {
        let html = format!(
            "<h1>Welcome to SparkHub</h1>\
             <p>Your {} plan is active. Log in to your dashboard to get started \
             with your training.</p>",
            tier_display(tier)
        );
        self.send(to, "Welcome to SparkHub", html).await
    }

    async fn send_payment_failed(
        &self,
        to: &str,
        amount_due: i64,
        hosted_invoice_url: Option<&str>,
    ) -> Result<(), DomainError> {
        let pay_link = match hosted_invoice_url {
            Some(url) => format!("<p><a href=\"{}\">Pay your invoice</a></p>", url),
            None => String::new(),
        };
        let html = format!(
            "<h1>Payment failed</h1>\
             <p>We could not collect your latest payment of {}. Please update \
             your payment details to keep your subscription active.</p>{}",
            format_pence(amount_due),
            pay_link
        );
        self.send(to, "Action needed: payment failed", html).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pence_formatting() {
        assert_eq!(format_pence(999), "£9.99");
        assert_eq!(format_pence(100), "£1.00");
        assert_eq!(format_pence(5), "£0.05");
        assert_eq!(format_pence(12000), "£120.00");
    }

    #[test]
    fn tier_display_names() {
        assert_eq!(tier_display(Tier::Electrician), "Electrician");
        assert_eq!(tier_display(Tier::Unknown), "SparkHub");
    }

    #[test]
    fn send_request_serializes() {
        let request = SendRequest {
            from: "SparkHub <hello@sparkhub.co.uk>",
            to: ["spark@example.co.uk"],
            subject: "Welcome to SparkHub",
            html: "<p>hi</p>".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["to"][0], "spark@example.co.uk");
        assert_eq!(json["subject"], "Welcome to SparkHub");
    }
}
