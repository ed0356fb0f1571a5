//! User directory handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::AppState;
use crate::error::AppError;
use crate::identity::{authorize, VerifiedIdentity};
use crate::models::{ApiResponse, UpdateUserAdmin, UpsertUser, User, UserRole};

type UserResponse<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

/// Create or refresh the caller's record on login
pub async fn login(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Json(input): Json<UpsertUser>,
) -> UserResponse<User> {
    let user = state.users.login(&identity, input).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(user))))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> UserResponse<User> {
    let user = state.users.current(&identity).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(user))))
}

// =============================================================================
// Admin
// =============================================================================

pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> UserResponse<Vec<User>> {
    authorize(UserRole::Admin, &identity, state.store.as_ref()).await?;
    let users = state.users.list().await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(users))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(email): Path<String>,
    Json(input): Json<UpdateUserAdmin>,
) -> UserResponse<User> {
    let admin = authorize(UserRole::Admin, &identity, state.store.as_ref()).await?;
    let user = state.users.update_admin_fields(&admin, &email, input).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(user))))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(email): Path<String>,
) -> UserResponse<()> {
    let admin = authorize(UserRole::Admin, &identity, state.store.as_ref()).await?;
    state.users.delete(&admin, &email).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(()))))
}
