//! HTTP request handlers

pub mod applications;
pub mod middleware;
pub mod payments;
pub mod tuitions;
pub mod users;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::db::EntityStore;
use crate::identity::IdentityVerifier;
use crate::payments::PaymentProvider;
use crate::services::{
    ApplicationService, CheckoutSettings, PaymentService, TuitionService, UserService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub tuitions: TuitionService,
    pub applications: ApplicationService,
    pub payments: PaymentService,
    pub users: UserService,
    pub is_production: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        provider: Arc<dyn PaymentProvider>,
        identity: Arc<dyn IdentityVerifier>,
        checkout: CheckoutSettings,
        is_production: bool,
    ) -> Self {
        Self {
            tuitions: TuitionService::new(store.clone()),
            applications: ApplicationService::new(store.clone()),
            payments: PaymentService::new(store.clone(), provider, checkout),
            users: UserService::new(store.clone()),
            store,
            identity,
            is_production,
        }
    }
}

/// Build the service router: health checks plus the `/api` tree.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/tuitions", get(tuitions::list_tuitions))
        .route("/tuitions/:id", get(tuitions::get_tuition))
        // Authenticated by the provider's signature, not a bearer token
        .route("/payments/webhook", post(payments::stripe_webhook));

    let protected = Router::new()
        // User directory
        .route("/users", post(users::login).get(users::list_users))
        .route("/users/me", get(users::get_current_user))
        .route(
            "/users/:email",
            patch(users::update_user).delete(users::delete_user),
        )
        // Tuitions
        .route("/tuitions", post(tuitions::create_tuition))
        .route(
            "/tuitions/:id",
            patch(tuitions::update_tuition).delete(tuitions::delete_tuition),
        )
        .route("/tuitions/:id/status", patch(tuitions::update_tuition_status))
        // Applications
        .route(
            "/applications",
            post(applications::create_application).get(applications::list_applications),
        )
        .route(
            "/applications/:id",
            get(applications::get_application)
                .patch(applications::update_application)
                .delete(applications::withdraw_application),
        )
        .route(
            "/applications/:id/approve",
            post(applications::approve_application),
        )
        .route(
            "/applications/:id/reject",
            post(applications::reject_application),
        )
        // Payments
        .route(
            "/payments/checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/payments/confirm", post(payments::confirm_payment))
        .route("/payments", get(payments::list_payments))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_identity,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", public.merge(protected))
        .layer(from_fn_with_state(state.clone(), middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "eTuition server is running"
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
