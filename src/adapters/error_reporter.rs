//! Error reporter adapters.
//!
//! The default sink is structured logging; an optional HTTP collector can
//! be layered on for operator alerting. Both swallow their own failures:
//! an anomaly report must never take down webhook processing.

use async_trait::async_trait;
use serde::Serialize;

use crate::ports::{ErrorContext, ErrorReporter};

/// Reports anomalies through tracing at error level.
pub struct TracingErrorReporter;

#[async_trait]
impl ErrorReporter for TracingErrorReporter {
    async fn report(&self, context: &ErrorContext) {
        tracing::error!(
            category = %context.category,
            event_id = context.event_id.as_deref().unwrap_or("-"),
            customer_id = context.customer_id.as_deref().unwrap_or("-"),
            "{}",
            context.message
        );
    }
}

/// Reports anomalies to an HTTP collector in addition to logging.
pub struct HttpErrorReporter {
    collector_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ReportBody<'a> {
    category: &'a str,
    message: &'a str,
    event_id: Option<&'a str>,
    customer_id: Option<&'a str>,
}

impl HttpErrorReporter {
    pub fn new(collector_url: impl Into<String>) -> Self {
        Self {
            collector_url: collector_url.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ErrorReporter for HttpErrorReporter {
    async fn report(&self, context: &ErrorContext) {
        TracingErrorReporter.report(context).await;

        let body = ReportBody {
            category: &context.category,
            message: &context.message,
            event_id: context.event_id.as_deref(),
            customer_id: context.customer_id.as_deref(),
        };

        let result = self
            .http_client
            .post(&self.collector_url)
            .json(&body)
            .send()
            .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, "error collector unreachable, report logged only");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracing_reporter_never_fails() {
        let reporter = TracingErrorReporter;
        let context = ErrorContext::new("user_resolution_failed", "no user for cus_1")
            .with_customer_id("cus_1");
        // Infallible by contract.
        reporter.report(&context).await;
    }

    #[test]
    fn report_body_serializes() {
        let body = ReportBody {
            category: "user_resolution_failed",
            message: "no user",
            event_id: Some("evt_1"),
            customer_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["category"], "user_resolution_failed");
        assert!(json["customer_id"].is_null());
    }
}
