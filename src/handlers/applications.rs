//! Tutor application handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::AppState;
use crate::error::AppError;
use crate::identity::{active_user, authorize, VerifiedIdentity};
use crate::models::{
    ApiResponse, Application, ApplicationFilter, CreateApplication, UpdateApplication, UserRole,
};
use crate::validation::parse_id;

type ApplicationResponse<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

// =============================================================================
// Tutor Endpoints
// =============================================================================

pub async fn create_application(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Json(input): Json<CreateApplication>,
) -> ApplicationResponse<Application> {
    let tutor = authorize(UserRole::Tutor, &identity, state.store.as_ref()).await?;
    let application = state.applications.submit(&tutor, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(application))))
}

pub async fn update_application(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
    Json(input): Json<UpdateApplication>,
) -> ApplicationResponse<Application> {
    let id = parse_id("id", &id)?;
    let tutor = authorize(UserRole::Tutor, &identity, state.store.as_ref()).await?;
    let application = state.applications.edit(&tutor, id, input).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(application))))
}

pub async fn withdraw_application(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> ApplicationResponse<()> {
    let id = parse_id("id", &id)?;
    let tutor = authorize(UserRole::Tutor, &identity, state.store.as_ref()).await?;
    state.applications.withdraw(&tutor, id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(()))))
}

// =============================================================================
// Shared
// =============================================================================

pub async fn list_applications(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Query(filter): Query<ApplicationFilter>,
) -> ApplicationResponse<Vec<Application>> {
    let viewer = active_user(&identity, state.store.as_ref()).await?;
    let applications = state.applications.list(&viewer, filter).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(applications))))
}

pub async fn get_application(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> ApplicationResponse<Application> {
    let id = parse_id("id", &id)?;
    let viewer = active_user(&identity, state.store.as_ref()).await?;
    let application = state.applications.get(&viewer, id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(application))))
}

// =============================================================================
// Admin Decisions
// =============================================================================

pub async fn approve_application(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> ApplicationResponse<Application> {
    let id = parse_id("id", &id)?;
    let admin = authorize(UserRole::Admin, &identity, state.store.as_ref()).await?;
    let application = state.applications.approve(&admin, id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(application))))
}

pub async fn reject_application(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    Path(id): Path<String>,
) -> ApplicationResponse<Application> {
    let id = parse_id("id", &id)?;
    let admin = authorize(UserRole::Admin, &identity, state.store.as_ref()).await?;
    let application = state.applications.reject(&admin, id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(application))))
}
