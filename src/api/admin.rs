use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::types::{AdminUserUpdateRequest, PlatformStatsDto, UserDto};
use super::{ApiError, ApiResponse, AppState};

/// GET /admin/users
/// List all users (admin only)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.store().list_users().await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// PATCH /admin/users/{id}
/// Toggle the active flag or change the role (admin only)
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(payload): Json<AdminUserUpdateRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let updated = state
        .store()
        .update_user_admin_fields(&user_id, payload.is_active, payload.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!("User {} updated by admin", updated.username);

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

/// GET /admin/stats
/// Platform-wide entity counts (admin only)
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PlatformStatsDto>>, ApiError> {
    let counts = state.store().platform_counts().await?;

    Ok(Json(ApiResponse::success(PlatformStatsDto {
        total_users: counts.users,
        total_apps: counts.apps,
        total_deployments: counts.deployments,
        total_functions: counts.functions,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })))
}
