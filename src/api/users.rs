use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::{MessageDto, UserDto, UserUpdateRequest};
use super::{ApiError, ApiResponse, AppState};

/// PATCH /users/me
/// Update the caller's profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UserUpdateRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if let Some(username) = &payload.username
        && state
            .store()
            .user_identity_taken(Some(username), None, Some(&user.id))
            .await?
    {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    if let Some(email) = &payload.email
        && state
            .store()
            .user_identity_taken(None, Some(email), Some(&user.id))
            .await?
    {
        return Err(ApiError::Conflict("Email already taken".to_string()));
    }

    let updated = state
        .store()
        .update_user_profile(
            &user.id,
            payload.username.as_deref(),
            payload.email.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

/// DELETE /users/me
/// Delete the account and everything it owns
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    state.store().delete_user_cascade(&user.id).await?;

    tracing::info!("Account deleted: {}", user.email);

    Ok(Json(ApiResponse::success(MessageDto {
        message: "Account deleted successfully".to_string(),
    })))
}
