//! eTuition Server
//!
//! Backend for a tutoring marketplace: students post tuition requests, tutors
//! apply, admins moderate, and payment finalizes a tutor assignment.
//!
//! ## Features
//!
//! - **Tuitions**: posting, moderation and public listing
//! - **Applications**: one per tutor per tuition, editable while pending
//! - **Payments**: Stripe Checkout, webhook and confirm-based settlement

mod config;
mod db;
mod error;
mod handlers;
mod identity;
mod models;
mod payments;
mod services;
mod validation;

use std::sync::Arc;

use handlers::AppState;
use identity::JwtIdentityVerifier;
use payments::StripeClient;
use services::CheckoutSettings;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etuition_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting eTuition server");
    tracing::info!("Environment: {:?}", config.environment);

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // External collaborators
    let store = Arc::new(db::PgStore::new(pool));
    let provider = Arc::new(StripeClient::new(
        &config.stripe_secret_key,
        &config.stripe_webhook_secret,
        &config.stripe_api_base,
        config.webhook_tolerance_secs,
    ));
    let identity = Arc::new(JwtIdentityVerifier::new(
        &config.identity_jwt_secret,
        config.identity_issuer.as_deref(),
        config.identity_audience.as_deref(),
    ));
    tracing::info!("Checkout currency: {}", config.payment_currency);

    // Create application state
    let state = AppState::new(
        store,
        provider,
        identity,
        CheckoutSettings::new(&config.client_url, &config.payment_currency),
        config.is_production(),
    );

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let app = handlers::router(state).layer(cors);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
