//! Axum router configuration for the billing surface.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers::{get_profile, handle_stripe_webhook, health, BillingAppState};

/// Create the billing router.
///
/// # Routes
///
/// - `POST /api/webhooks/stripe` - Stripe webhook deliveries (no auth,
///   signature checked inside the reconciler)
/// - `GET /api/billing/profile/:user_id` - entitlement view of a profile
/// - `GET /health` - liveness probe
///
/// CORS is permissive: the webhook endpoint is called server-to-server and
/// the health endpoint carries nothing sensitive.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/api/webhooks/stripe", post(handle_stripe_webhook))
        .route("/api/billing/profile/:user_id", get(get_profile))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Router wiring is exercised end to end in tests/webhook_endpoint.rs;
    // this only checks the router builds.
    #[test]
    fn billing_router_builds() {
        let _router = billing_router();
    }
}
