//! Middleware for bearer authentication and security headers

use crate::error::AppError;
use crate::handlers::AppState;
use crate::identity::{IdentityError, VerifiedIdentity};
use crate::models::User;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Verified identity extracted by middleware, available via Extension<VerifiedIdentity>
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_bearer_token(request.headers());

    let identity = match token {
        Some(token) => state.identity.verify(&token).await,
        None => Err(IdentityError::Missing),
    };

    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!("Rejected credential: {}", e);
            AppError::from(e).into_response()
        }
    }
}

/// Caller of a public route, if a credential was sent. An invalid credential
/// is still an error; an unknown account is treated as anonymous.
pub async fn optional_viewer(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, AppError> {
    let Some(token) = extract_bearer_token(headers) else {
        return Ok(None);
    };
    let identity: VerifiedIdentity = state.identity.verify(&token).await?;
    Ok(state.store.find_user_by_email(&identity.email).await?)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Security headers middleware
pub async fn security_headers(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    if state.is_production {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        );
    }

    response
}
