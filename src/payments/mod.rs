//! External payment provider contract

mod stripe;

#[cfg(test)]
pub mod testing;

use std::collections::HashMap;

use async_trait::async_trait;

pub use stripe::StripeClient;

/// Provider status string for a completed checkout
pub const PAID: &str = "paid";

/// Webhook event type carrying a completed checkout session
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Metadata keys embedded in a checkout session for later correlation
pub const META_APPLICATION_ID: &str = "applicationId";
pub const META_TUITION_ID: &str = "tuitionId";
pub const META_STUDENT_EMAIL: &str = "studentEmail";
pub const META_TUTOR_EMAIL: &str = "tutorEmail";

/// Checkout session ids look like `cs_<alphanumerics and underscores>`.
pub fn is_checkout_session_id(id: &str) -> bool {
    id.strip_prefix("cs_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutParams {
    /// Smallest currency unit
    pub amount: i64,
    pub currency: String,
    pub product_name: String,
    pub customer_email: String,
    pub metadata: HashMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Provider-side view of a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDetails {
    pub id: String,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl SessionDetails {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PAID
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// A webhook delivery whose signature has been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    /// Present for `checkout.session.*` events
    pub session: Option<SessionDetails>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("webhook signature rejected: {0}")]
    Signature(String),
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<CheckoutSession, ProviderError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, ProviderError>;

    /// Authenticate a raw webhook body against its signature header and decode it.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, ProviderError>;
}
