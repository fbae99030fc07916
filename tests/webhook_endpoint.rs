//! End-to-end tests for the Stripe webhook endpoint.
//!
//! Drives the Axum router with in-memory port implementations to verify
//! the delivery contract: handled or absorbed outcomes answer 200, only
//! unexpected failures answer 500.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use sparkhub::adapters::http::billing::{billing_router, BillingAppState};
use sparkhub::application::WebhookReconciler;
use sparkhub::domain::billing::{
    DunningRecord, EntitlementUpdate, Notification, PriceCatalog, StripeWebhookVerifier,
    SubscriberProfile, Tier,
};
use sparkhub::domain::foundation::{DomainError, Timestamp, UserId};
use sparkhub::ports::{
    DunningRepository, EmailSender, ErrorContext, ErrorReporter, NotificationStore,
    PaymentProvider, ProviderCustomer, ProviderError, SaveResult, SubscriberProfileRepository,
    UserDirectory,
};

const TEST_USER: &str = "5f0c9f6a-1c0e-4b3a-9f51-2e8a4a1b7c01";
const TEST_SECRET: &str = "whsec_endpoint_test";

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Default)]
struct MemoryProfiles {
    entitlements: Mutex<Vec<(UserId, EntitlementUpdate)>>,
    onboarded: Mutex<Vec<UserId>>,
}

#[async_trait]
impl SubscriberProfileRepository for MemoryProfiles {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriberProfile>, DomainError> {
        let entitlements = self.entitlements.lock().unwrap();
        Ok(entitlements
            .iter()
            .rev()
            .find(|(u, _)| u == user_id)
            .map(|(u, update)| {
                let mut profile = SubscriberProfile::new(u.clone());
                profile.entitlement = update.entitlement;
                profile.subscription_start = update.period_start;
                profile.subscription_end = update.period_end;
                profile.onboarding_completed =
                    self.onboarded.lock().unwrap().contains(user_id);
                profile
            }))
    }

    async fn find_customer_id(&self, _user_id: &UserId) -> Result<Option<String>, DomainError> {
        Ok(None)
    }

    async fn find_user_by_customer_id(
        &self,
        _customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        Ok(None)
    }

    async fn backfill_customer_id(
        &self,
        _user_id: &UserId,
        _customer_id: &str,
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn apply_entitlement(
        &self,
        user_id: &UserId,
        _customer_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<(), DomainError> {
        self.entitlements
            .lock()
            .unwrap()
            .push((user_id.clone(), update.clone()));
        Ok(())
    }

    async fn mark_onboarded(&self, user_id: &UserId) -> Result<bool, DomainError> {
        let mut onboarded = self.onboarded.lock().unwrap();
        if onboarded.contains(user_id) {
            return Ok(false);
        }
        onboarded.push(user_id.clone());
        Ok(true)
    }
}

#[derive(Default)]
struct MemoryDunning {
    records: Mutex<Vec<DunningRecord>>,
}

#[async_trait]
impl DunningRepository for MemoryDunning {
    async fn find_unresolved_by_invoice_id(
        &self,
        invoice_id: &str,
    ) -> Result<Option<DunningRecord>, DomainError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.stripe_invoice_id == invoice_id && !r.resolved)
            .cloned())
    }

    async fn insert(&self, record: &DunningRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.stripe_invoice_id == record.stripe_invoice_id && !r.resolved)
        {
            return Ok(SaveResult::AlreadyExists);
        }
        records.push(record.clone());
        Ok(SaveResult::Inserted)
    }

    async fn record_email_sent(&self, invoice_id: &str) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        if let Some(r) = records
            .iter_mut()
            .find(|r| r.stripe_invoice_id == invoice_id && !r.resolved)
        {
            r.emails_sent += 1;
        }
        Ok(())
    }

    async fn resolve_by_invoice_id(
        &self,
        invoice_id: &str,
        at: Timestamp,
    ) -> Result<Option<DunningRecord>, DomainError> {
        let mut records = self.records.lock().unwrap();
        if let Some(r) = records
            .iter_mut()
            .find(|r| r.stripe_invoice_id == invoice_id && !r.resolved)
        {
            let before = r.clone();
            r.resolved = true;
            r.resolved_at = Some(at);
            return Ok(Some(before));
        }
        Ok(None)
    }

    async fn resolve_by_subscription_id(
        &self,
        subscription_id: &str,
        at: Timestamp,
    ) -> Result<u64, DomainError> {
        let mut records = self.records.lock().unwrap();
        let mut resolved = 0;
        for r in records
            .iter_mut()
            .filter(|r| r.stripe_subscription_id.as_deref() == Some(subscription_id) && !r.resolved)
        {
            r.resolved = true;
            r.resolved_at = Some(at);
            resolved += 1;
        }
        Ok(resolved)
    }
}

struct StubProvider;

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProviderCustomer>, ProviderError> {
        Ok(Some(ProviderCustomer {
            id: customer_id.to_string(),
            email: Some("spark@example.co.uk".to_string()),
            name: Some("Sam Sparks".to_string()),
        }))
    }
}

struct StubDirectory;

#[async_trait]
impl UserDirectory for StubDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, DomainError> {
        if email.eq_ignore_ascii_case("spark@example.co.uk") {
            return Ok(Some(UserId::new(TEST_USER).unwrap()));
        }
        Ok(None)
    }
}

#[derive(Default)]
struct MemoryNotifications {
    inserted: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationStore for MemoryNotifications {
    async fn insert(&self, notification: &Notification) -> Result<(), DomainError> {
        self.inserted.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryEmails {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl EmailSender for MemoryEmails {
    async fn send_welcome(&self, to: &str, _tier: Tier) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push(format!("welcome:{to}"));
        Ok(())
    }

    async fn send_payment_failed(
        &self,
        to: &str,
        _amount_due: i64,
        _hosted_invoice_url: Option<&str>,
    ) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push(format!("dunning:{to}"));
        Ok(())
    }
}

struct NullReporter;

#[async_trait]
impl ErrorReporter for NullReporter {
    async fn report(&self, _context: &ErrorContext) {}
}

struct Harness {
    app: axum::Router,
    profiles: Arc<MemoryProfiles>,
    dunning: Arc<MemoryDunning>,
    emails: Arc<MemoryEmails>,
}

fn harness(verifier: Option<StripeWebhookVerifier>) -> Harness {
    let profiles = Arc::new(MemoryProfiles::default());
    let dunning = Arc::new(MemoryDunning::default());
    let emails = Arc::new(MemoryEmails::default());

    let catalog = PriceCatalog::from_entries(
        1,
        [("price_electrician_monthly".to_string(), Tier::Electrician)],
    );

    let reconciler = Arc::new(WebhookReconciler::new(
        profiles.clone(),
        dunning.clone(),
        Arc::new(StubProvider),
        Arc::new(StubDirectory),
        Arc::new(MemoryNotifications::default()),
        emails.clone(),
        Arc::new(NullReporter),
        catalog,
        verifier,
    ));

    let app = billing_router().with_state(BillingAppState {
        reconciler,
        profiles: profiles.clone(),
    });
    Harness {
        app,
        profiles,
        dunning,
        emails,
    }
}

fn subscription_body(status: &str) -> String {
    json!({
        "id": "evt_http_1",
        "type": "customer.subscription.created",
        "created": 1704067200,
        "data": {
            "object": {
                "id": "sub_http_1",
                "customer": "cus_http_1",
                "status": status,
                "current_period_start": 1704067200,
                "current_period_end": 1706745600,
                "metadata": {"user_id": TEST_USER},
                "items": {"data": [{"price": {"id": "price_electrician_monthly"}}]}
            }
        }
    })
    .to_string()
}

fn invoice_failed_body() -> String {
    json!({
        "id": "evt_http_2",
        "type": "invoice.payment_failed",
        "data": {
            "object": {
                "id": "in_http_1",
                "customer": "cus_http_1",
                "subscription": "sub_http_1",
                "amount_due": 2900,
                "hosted_invoice_url": "https://pay.stripe.com/in_http_1",
                "customer_email": "spark@example.co.uk"
            }
        }
    })
    .to_string()
}

fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

async fn post_webhook(
    app: axum::Router,
    body: String,
    signature: Option<String>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        request = request.header("Stripe-Signature", sig);
    }

    let response = app
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn subscription_event_is_acknowledged_and_applied() {
    let h = harness(None);

    let (status, body) = post_webhook(h.app, subscription_body("active"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(body["type"], "customer.subscription.created");

    let entitlements = h.profiles.entitlements.lock().unwrap();
    assert_eq!(entitlements.len(), 1);
    assert_eq!(entitlements[0].0.as_str(), TEST_USER);

    // First activation fires the welcome email.
    let sent = h.emails.sent.lock().unwrap();
    assert_eq!(sent.as_slice(), ["welcome:spark@example.co.uk"]);
}

#[tokio::test]
async fn payment_failure_tracks_and_emails_once() {
    let h = harness(None);

    let (status, body) = post_webhook(h.app.clone(), invoice_failed_body(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "invoice.payment_failed");

    // Redelivery of the same invoice is a no-op.
    let (status, _) = post_webhook(h.app, invoice_failed_body(), None).await;
    assert_eq!(status, StatusCode::OK);

    let records = h.dunning.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].emails_sent, 1);

    let sent = h.emails.sent.lock().unwrap();
    assert_eq!(sent.as_slice(), ["dunning:spark@example.co.uk"]);
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged() {
    let h = harness(None);

    let body = json!({
        "id": "evt_http_3",
        "type": "charge.succeeded",
        "data": {"object": {}}
    })
    .to_string();

    let (status, json) = post_webhook(h.app, body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "charge.succeeded");
}

#[tokio::test]
async fn malformed_payload_answers_500() {
    let h = harness(None);

    let (status, body) = post_webhook(h.app, "{not json".to_string(), None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Parse error"));
}

#[tokio::test]
async fn valid_signature_is_accepted() {
    let h = harness(Some(StripeWebhookVerifier::new(TEST_SECRET)));

    let body = subscription_body("active");
    let signature = sign(TEST_SECRET, chrono::Utc::now().timestamp(), &body);

    let (status, json) = post_webhook(h.app, body, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
}

#[tokio::test]
async fn invalid_signature_still_processes_delivery() {
    let h = harness(Some(StripeWebhookVerifier::new(TEST_SECRET)));

    let body = subscription_body("active");
    let signature = sign("whsec_other_secret", chrono::Utc::now().timestamp(), &body);

    let (status, json) = post_webhook(h.app, body, Some(signature)).await;

    // A bad signature downgrades to unverified processing, never rejects.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
    assert_eq!(h.profiles.entitlements.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn profile_endpoint_reflects_applied_entitlement() {
    let h = harness(None);

    let (status, _) = post_webhook(h.app.clone(), subscription_body("active"), None).await;
    assert_eq!(status, StatusCode::OK);

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/billing/profile/{TEST_USER}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["subscribed"], true);
    assert_eq!(json["tier"], "electrician");
    assert_eq!(json["onboarding_completed"], true);

    // A user billing has never seen answers 404.
    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/billing/profile/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let h = harness(None);

    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
}
