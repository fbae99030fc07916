//! HTTP handlers for the billing webhook endpoint.
//!
//! The provider's delivery contract shapes the responses: any outcome the
//! reconciler absorbed answers 200 so the provider stops redelivering, and
//! only unexpected failures answer 500 to request a retry.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::WebhookReconciler;
use crate::domain::foundation::UserId;
use crate::ports::SubscriberProfileRepository;

use super::dto::{ErrorBody, HealthResponse, ProfileResponse, WebhookAck};

/// Shared application state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub reconciler: Arc<WebhookReconciler>,
    pub profiles: Arc<dyn SubscriberProfileRepository>,
}

/// POST /api/webhooks/stripe - handle a Stripe webhook delivery.
///
/// The signature header is optional at this layer: a missing or invalid
/// signature downgrades processing inside the reconciler rather than
/// rejecting the delivery.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> axum::response::Response {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());

    match state.reconciler.reconcile(&body, signature).await {
        Ok(report) => {
            let ack = WebhookAck {
                received: true,
                event_type: report.event_type,
            };
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "webhook processing failed");
            let body = ErrorBody {
                error: err.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// GET /api/billing/profile/:user_id - entitlement view for a user.
///
/// The read the rest of the platform gates paid features on. A user that
/// has never touched billing gets a 404 rather than a synthetic inactive
/// profile.
pub async fn get_profile(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user_id = match UserId::new(user_id) {
        Ok(id) => id,
        Err(err) => {
            let body = ErrorBody {
                error: err.to_string(),
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    match state.profiles.find_by_user(&user_id).await {
        Ok(Some(profile)) => {
            let response = ProfileResponse {
                user_id: profile.user_id.to_string(),
                subscribed: profile.subscribed(),
                tier: profile.entitlement.tier().map(|t| t.as_str().to_string()),
                expires_at: profile
                    .entitlement
                    .expires_at()
                    .map(|t| *t.as_datetime()),
                onboarding_completed: profile.onboarding_completed,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => {
            let body = ErrorBody {
                error: "Profile not found".to_string(),
            };
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, %user_id, "profile lookup failed");
            let body = ErrorBody {
                error: "Profile lookup failed".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// GET /health - liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
