//! Bearer credential verification and role authorization

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::db::EntityStore;
use crate::error::AppError;
use crate::models::{User, UserRole, UserStatus};

/// Identity established by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("missing bearer credential")]
    Missing,
    #[error("invalid credential: {0}")]
    Invalid(String),
    #[error("credential carries no email")]
    NoEmail,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
}

/// Verifies HS256 tokens minted by the identity provider.
pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let claims = decode::<Claims>(bearer_token, &self.decoding_key, &self.validation)
            .map_err(|e| IdentityError::Invalid(e.to_string()))?
            .claims;

        let email = claims
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or(IdentityError::NoEmail)?;

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email,
        })
    }
}

/// Resolve the caller's user record; blocked accounts are refused.
pub async fn active_user(
    identity: &VerifiedIdentity,
    store: &dyn EntityStore,
) -> Result<User, AppError> {
    let user = store
        .find_user_by_email(&identity.email)
        .await?
        .ok_or_else(|| AppError::Auth("no account for this identity".to_string()))?;

    if user.status == UserStatus::Blocked {
        return Err(AppError::Forbidden("account is blocked".to_string()));
    }
    Ok(user)
}

/// Require the caller to hold `role`.
pub async fn authorize(
    role: UserRole,
    identity: &VerifiedIdentity,
    store: &dyn EntityStore,
) -> Result<User, AppError> {
    let user = active_user(identity, store).await?;
    if user.role != role {
        return Err(AppError::Forbidden(format!(
            "{:?} role required",
            role
        )));
    }
    Ok(user)
}
