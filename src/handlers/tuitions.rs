//! Tuition request handlers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::Deserialize;

use super::middleware::optional_viewer;
use super::AppState;
use crate::error::AppError;
use crate::identity::{active_user, authorize, VerifiedIdentity};
use crate::models::{ApiResponse, CreateTuition, Tuition, TuitionFilter, UpdateTuition, UserRole};
use crate::validation::parse_id;

type TuitionResponse<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// =============================================================================
// Public
// =============================================================================

/// List tuitions. Anonymous callers only see approved ones.
pub async fn list_tuitions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<TuitionFilter>,
) -> TuitionResponse<Vec<Tuition>> {
    let viewer = optional_viewer(&state, &headers).await?;
    let tuitions = state.tuitions.list(viewer.as_ref(), filter).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(tuitions))))
}

pub async fn get_tuition(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> TuitionResponse<Tuition> {
    let id = parse_id("id", &id)?;
    let viewer = optional_viewer(&state, &headers).await?;
    let tuition = state.tuitions.get(viewer.as_ref(), id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(tuition))))
}

// =============================================================================
// Authenticated
// =============================================================================

pub async fn create_tuition(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Json(input): Json<CreateTuition>,
) -> TuitionResponse<Tuition> {
    let user = active_user(&identity, state.store.as_ref()).await?;
    let tuition = state.tuitions.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tuition))))
}

pub async fn update_tuition(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTuition>,
) -> TuitionResponse<Tuition> {
    let id = parse_id("id", &id)?;
    let user = active_user(&identity, state.store.as_ref()).await?;
    let tuition = state.tuitions.edit(&user, id, input).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(tuition))))
}

pub async fn delete_tuition(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> TuitionResponse<()> {
    let id = parse_id("id", &id)?;
    let user = active_user(&identity, state.store.as_ref()).await?;
    state.tuitions.delete(&user, id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(()))))
}

/// Admin moderation
pub async fn update_tuition_status(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
    Json(input): Json<UpdateStatusRequest>,
) -> TuitionResponse<Tuition> {
    let id = parse_id("id", &id)?;
    let admin = authorize(UserRole::Admin, &identity, state.store.as_ref()).await?;
    let tuition = state
        .tuitions
        .set_moderation_status(&admin, id, &input.status)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(tuition))))
}
