use axum::{
    Json,
    extract::{Extension, Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::identity::Caller;
use super::types::double_option;
use super::{ApiError, ApiResponse, AppState, UserDto};
use crate::domain::UserId;
use crate::entities::users::Role;
use crate::services::{NewUser, UserPatchInput};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "double_option")]
    pub reports_to: Option<Option<i32>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<NewUser>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.users().create_user(payload, caller.id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.users().list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.users().get_user(UserId::new(id)).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let patch = UserPatchInput {
        name: payload.name,
        email: payload.email,
        role: payload.role,
        reports_to: payload.reports_to,
    };

    let user = state
        .users()
        .update_user(UserId::new(id), patch, caller.id)
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

/// POST /api/users/{id}/deactivate
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .users()
        .deactivate_user(UserId::new(id), caller.id)
        .await?;

    Ok(Json(ApiResponse::success(())))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.users().delete_user(UserId::new(id), caller.id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// GET /api/users/{id}/chain
pub async fn manager_chain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let chain = state.users().manager_chain(UserId::new(id)).await?;
    Ok(Json(ApiResponse::success(chain)))
}
