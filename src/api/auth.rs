use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use super::types::{
    ApiKeyCreateRequest, ApiKeyDto, LoginRequest, MessageDto, RefreshRequest, SignupRequest,
    UserDto,
};
use crate::db::User;
use crate::services::TokenPair;

/// Authenticated user attached to the request by `auth_middleware`.
#[derive(Clone)]
pub struct CurrentUser(pub User);

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware. Accepts one bearer-style credential from
/// either the `Authorization: Bearer` or `X-Api-Key` header; the auth
/// service decides whether it is a session token or an API key.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(credential) = extract_credential(&headers) else {
        return Err(ApiError::Unauthorized("Missing credentials".to_string()));
    };

    let user = state.auth().authenticate(&credential).await?;

    tracing::Span::current().record("user_id", user.id.as_str());
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Role gate layered on top of `auth_middleware` for admin routes.
pub async fn require_admin_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>() else {
        return Err(ApiError::Unauthorized("Missing credentials".to_string()));
    };

    state.auth().authorize_admin(user)?;

    Ok(next.run(request).await)
}

/// Extract a credential from the `Authorization: Bearer` or `X-Api-Key`
/// header.
fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
/// Register a new account
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth()
        .signup(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// POST /auth/login
/// Verify email + password, returns an access/refresh token pair
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let pair = state.auth().login(&payload.email, &payload.password).await?;

    Ok(Json(ApiResponse::success(pair)))
}

/// POST /auth/refresh
/// Exchange a refresh token for a fresh pair
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    let pair = state.auth().refresh(&payload.refresh_token).await?;

    Ok(Json(ApiResponse::success(pair)))
}

/// GET /auth/me
/// Current user info
pub async fn me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(user)))
}

/// POST /auth/api-keys
/// Create an API key; the full secret is only ever returned here
pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ApiKeyCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = state.auth().create_api_key(&user.id, &payload.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ApiKeyDto::from(key))),
    ))
}

/// GET /auth/api-keys
/// List the caller's API keys (masked)
pub async fn list_api_keys(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<ApiKeyDto>>>, ApiError> {
    let keys = state.auth().list_api_keys(&user.id).await?;

    Ok(Json(ApiResponse::success(
        keys.into_iter().map(ApiKeyDto::from).collect(),
    )))
}

/// DELETE /auth/api-keys/{id}
pub async fn delete_api_key(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(key_id): Path<String>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    state.auth().delete_api_key(&user.id, &key_id).await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "API key deleted successfully".to_string(),
    })))
}
