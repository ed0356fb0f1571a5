//! Stripe Checkout adapter

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;

use super::{
    is_checkout_session_id, CheckoutParams, CheckoutSession, PaymentProvider, ProviderError,
    SessionDetails, WebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
    base_url: String,
    tolerance_secs: i64,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    amount_total: Option<i64>,
    currency: Option<String>,
    metadata: Option<HashMap<String, String>>,
}

impl From<StripeSession> for SessionDetails {
    fn from(session: StripeSession) -> Self {
        Self {
            id: session.id,
            payment_status: session.payment_status.unwrap_or_default(),
            amount_total: session.amount_total,
            currency: session.currency,
            metadata: session.metadata.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    message: String,
}

impl StripeClient {
    pub fn new(
        secret_key: &str,
        webhook_secret: &str,
        base_url: &str,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
            webhook_secret: webhook_secret.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tolerance_secs,
        }
    }

    async fn read_session(response: reqwest::Response) -> Result<StripeSession, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<StripeSession>()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
        }

        let message = match response.json::<StripeError>().await {
            Ok(err) => err.error.message,
            Err(_) => "unreadable error body".to_string(),
        };
        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Form fields for `POST /checkout/sessions`.
fn checkout_form(params: &CheckoutParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
        ("customer_email".to_string(), params.customer_email.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            params.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            params.amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            params.product_name.clone(),
        ),
    ];

    let mut metadata: Vec<_> = params.metadata.iter().collect();
    metadata.sort();
    for (key, value) in metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

/// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against the raw body.
pub(crate) fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), ProviderError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| ProviderError::Signature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(ProviderError::Signature("missing v1 signature".to_string()));
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(ProviderError::Signature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| ProviderError::Signature("invalid webhook secret".to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(ProviderError::Signature("no matching signature".to_string()))
}

/// Decode a verified webhook body.
pub(crate) fn parse_event(payload: &[u8]) -> Result<WebhookEvent, ProviderError> {
    let event: StripeEvent = serde_json::from_slice(payload)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let session = if event.event_type.starts_with("checkout.session.") {
        let session: StripeSession = serde_json::from_value(event.data.object)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Some(session.into())
    } else {
        None
    };

    Ok(WebhookEvent {
        id: event.id,
        event_type: event.event_type,
        session,
    })
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<CheckoutSession, ProviderError> {
        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(&params))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let session = Self::read_session(response).await?;
        let url = session
            .url
            .ok_or_else(|| ProviderError::InvalidResponse("session has no url".to_string()))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, ProviderError> {
        // The id becomes a path segment
        if !is_checkout_session_id(session_id) {
            return Err(ProviderError::InvalidRequest(format!(
                "malformed checkout session id '{session_id}'"
            )));
        }

        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.base_url, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self::read_session(response).await?.into())
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, ProviderError> {
        verify_signature(
            &self.webhook_secret,
            payload,
            signature_header,
            Utc::now().timestamp(),
            self.tolerance_secs,
        )?;
        parse_event(payload)
    }
}
