//! SparkHub billing service entry point.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sparkhub::adapters::auth::{AuthDirectoryConfig, HttpUserDirectory};
use sparkhub::adapters::email::{ResendConfig, ResendEmailSender};
use sparkhub::adapters::error_reporter::{HttpErrorReporter, TracingErrorReporter};
use sparkhub::adapters::http::billing::{billing_router, BillingAppState};
use sparkhub::adapters::postgres::{
    PostgresDunningRepository, PostgresNotificationStore, PostgresProfileRepository,
};
use sparkhub::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use sparkhub::application::WebhookReconciler;
use sparkhub::config::AppConfig;
use sparkhub::domain::billing::StripeWebhookVerifier;
use sparkhub::ports::ErrorReporter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!(
        environment = ?config.server.environment,
        "starting sparkhub billing service"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let catalog = config.payment.price_catalog()?;
    tracing::info!(
        version = catalog.version(),
        prices = catalog.len(),
        "price catalog loaded"
    );

    let verifier = match &config.payment.stripe_webhook_secret {
        Some(secret) => Some(StripeWebhookVerifier::new(secret.clone())),
        None => {
            tracing::warn!("no webhook signing secret configured, events will be unverified");
            None
        }
    };

    let profiles: Arc<PostgresProfileRepository> =
        Arc::new(PostgresProfileRepository::new(pool.clone()));
    let dunning = Arc::new(PostgresDunningRepository::new(pool.clone()));
    let notifications = Arc::new(PostgresNotificationStore::new(pool.clone()));
    let provider = Arc::new(StripePaymentAdapter::new(StripeConfig::new(
        config.payment.stripe_api_key.clone(),
    )));
    let directory = Arc::new(HttpUserDirectory::new(AuthDirectoryConfig::new(
        config.auth.base_url.clone(),
        config.auth.service_key.clone(),
    )));
    let emails = Arc::new(ResendEmailSender::new(ResendConfig::new(
        config.email.resend_api_key.clone(),
        config.email.from_header(),
    )));
    let error_reporter: Arc<dyn ErrorReporter> = match &config.server.error_collector_url {
        Some(url) => Arc::new(HttpErrorReporter::new(url.clone())),
        None => Arc::new(TracingErrorReporter),
    };

    let reconciler = Arc::new(WebhookReconciler::new(
        profiles.clone(),
        dunning,
        provider,
        directory,
        notifications,
        emails,
        error_reporter,
        catalog,
        verifier,
    ));

    let app = billing_router()
        .with_state(BillingAppState {
            reconciler,
            profiles,
        })
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
