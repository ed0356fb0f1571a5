//! Domain error taxonomy and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::db::StoreError;
use crate::identity::IdentityError;
use crate::models::ApiResponse;
use crate::payments::ProviderError;
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    /// The application can no longer be paid for.
    #[error("application is {0} and cannot be paid for")]
    NotPayable(&'static str),

    /// The provider reports the checkout session as not (yet) paid.
    #[error("payment not completed (status: {0})")]
    PaymentIncomplete(String),

    /// Money was received but the assignment could not be recorded.
    #[error("settlement failed: {0}")]
    Settlement(String),

    #[error("payment provider error: {0}")]
    Provider(ProviderError),

    #[error(transparent)]
    Store(StoreError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) | AppError::NotPayable(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::PaymentIncomplete(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Settlement(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                AppError::Conflict(format!("duplicate record ({constraint})"))
            }
            other => AppError::Store(other),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Signature(reason) => {
                AppError::Auth(format!("invalid webhook signature: {reason}"))
            }
            other => AppError::Provider(other),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::Auth(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the log
        let message = match &self {
            AppError::Store(err) => {
                tracing::error!("Store error: {}", err);
                "Database error".to_string()
            }
            AppError::Settlement(_) => "Payment received but settlement failed".to_string(),
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
