//! Scripted payment provider for tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    CheckoutParams, CheckoutSession, PaymentProvider, ProviderError, SessionDetails, WebhookEvent,
    PAID,
};

/// Signature header value the fake accepts.
pub const VALID_SIGNATURE: &str = "t=0,v1=valid";

#[derive(Default)]
pub struct FakeProvider {
    sessions: Mutex<HashMap<String, SessionDetails>>,
    created: Mutex<Vec<CheckoutParams>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<CheckoutParams> {
        self.created.lock().unwrap().clone()
    }

    pub fn set_status(&self, session_id: &str, status: &str) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(session_id) {
            session.payment_status = status.to_string();
        }
    }

    pub fn mark_paid(&self, session_id: &str) {
        self.set_status(session_id, PAID);
    }

    pub fn session(&self, session_id: &str) -> Option<SessionDetails> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }

    /// Register a session directly, e.g. one carrying hand-written metadata.
    pub fn insert_session(&self, session: SessionDetails) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<CheckoutSession, ProviderError> {
        let mut created = self.created.lock().unwrap();
        let id = format!("cs_test_{}", created.len() + 1);
        self.sessions.lock().unwrap().insert(
            id.clone(),
            SessionDetails {
                id: id.clone(),
                payment_status: "unpaid".to_string(),
                amount_total: Some(params.amount),
                currency: Some(params.currency.clone()),
                metadata: params.metadata.clone(),
            },
        );
        created.push(params);

        Ok(CheckoutSession {
            url: format!("https://checkout.test/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, ProviderError> {
        self.session(session_id).ok_or(ProviderError::Api {
            status: 404,
            message: format!("No such checkout.session: {session_id}"),
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, ProviderError> {
        if signature_header != VALID_SIGNATURE {
            return Err(ProviderError::Signature("no matching signature".to_string()));
        }
        super::stripe::parse_event(payload)
    }
}
