//! Checkout, confirmation, webhook and ledger handlers

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;

use super::AppState;
use crate::error::AppError;
use crate::identity::{active_user, authorize, VerifiedIdentity};
use crate::models::{
    ApiResponse, CheckoutRequest, CheckoutResponse, ConfirmPaymentRequest, Payment, PaymentFilter,
    UserRole,
};
use crate::services::FinalizeOutcome;

const SIGNATURE_HEADER: &str = "stripe-signature";

type PaymentResponse<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Start a provider checkout for one of the student's pending applications
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Json(input): Json<CheckoutRequest>,
) -> PaymentResponse<CheckoutResponse> {
    let student = authorize(UserRole::Student, &identity, state.store.as_ref()).await?;
    let checkout = state
        .payments
        .create_checkout_session(&student, input.application_id)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(checkout))))
}

/// Confirm a checkout after the provider redirected the student back
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Json(input): Json<ConfirmPaymentRequest>,
) -> PaymentResponse<FinalizeOutcome> {
    let student = authorize(UserRole::Student, &identity, state.store.as_ref()).await?;
    let outcome = state
        .payments
        .confirm_payment(&student, &input.session_id)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(outcome))))
}

/// Provider webhook. Reads the raw body so the signature can be checked.
///
/// Settlement failures are acknowledged: they are terminal and already
/// logged, and a retry would fail the same way. Store errors are not, so the
/// provider redelivers.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.payments.handle_webhook(&body, signature).await {
        Ok(_) | Err(AppError::Settlement(_)) => (
            StatusCode::OK,
            Json(ApiResponse::success(WebhookAck { received: true })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Webhook rejected: {}", e);
            e.into_response()
        }
    }
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Query(filter): Query<PaymentFilter>,
) -> PaymentResponse<Vec<Payment>> {
    let viewer = active_user(&identity, state.store.as_ref()).await?;
    let payments = state.payments.list_payments(&viewer, filter).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(payments))))
}
