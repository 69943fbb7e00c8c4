use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::{AppCreateRequest, AppDto, AppUpdateRequest, MessageDto};
use super::validation::validate_app_name;
use super::{ApiError, ApiResponse, AppState};
use crate::db::AppUpdate;
use crate::models::{AppStatus, SourceType};

/// POST /apps
/// Create a new app
pub async fn create_app(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<AppCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validate_app_name(&payload.name)?;

    let (max_apps, base_domain) = {
        let platform = &state.config().platform;
        (platform.max_apps_per_user, platform.base_domain.clone())
    };

    let count = state.store().count_apps_for_user(&user.id).await?;
    if count >= max_apps {
        return Err(ApiError::validation(format!(
            "Maximum {max_apps} apps per user"
        )));
    }

    if state.store().app_name_taken(&user.id, &name).await? {
        return Err(ApiError::Conflict(
            "App with this name already exists".to_string(),
        ));
    }

    match payload.source_type {
        SourceType::Github => {
            if payload.source_config.get("repo_url").is_none() {
                return Err(ApiError::validation(
                    "GitHub repo_url required in source_config",
                ));
            }
        }
        SourceType::Docker => {
            if payload.source_config.get("image").is_none() {
                return Err(ApiError::validation("Docker image required in source_config"));
            }
        }
        SourceType::Script => {}
    }

    let app = state
        .store()
        .create_app(
            &user.id,
            &name,
            payload.description.as_deref(),
            payload.source_type,
            &payload.source_config,
            &payload.env_vars,
            &base_domain,
        )
        .await?;

    state
        .store()
        .add_activity_log(
            Some(&app.id),
            None,
            None,
            "deployment",
            "info",
            &format!("App '{}' created", app.name),
        )
        .await?;

    tracing::info!("App created: {} by user {}", app.name, user.email);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AppDto::from(app))),
    ))
}

/// GET /apps
/// List the caller's apps
pub async fn list_apps(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<AppDto>>>, ApiError> {
    let apps = state.store().list_apps_for_user(&user.id).await?;

    Ok(Json(ApiResponse::success(
        apps.into_iter().map(AppDto::from).collect(),
    )))
}

/// GET /apps/{id}
pub async fn get_app(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(app_id): Path<String>,
) -> Result<Json<ApiResponse<AppDto>>, ApiError> {
    let app = state
        .store()
        .get_app_owned(&app_id, &user.id)
        .await?
        .ok_or_else(ApiError::app_not_found)?;

    Ok(Json(ApiResponse::success(AppDto::from(app))))
}

/// PATCH /apps/{id}
pub async fn update_app(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(app_id): Path<String>,
    Json(payload): Json<AppUpdateRequest>,
) -> Result<Json<ApiResponse<AppDto>>, ApiError> {
    let update = AppUpdate {
        description: payload.description,
        env_vars: payload.env_vars,
        status: payload.status,
    };

    let app = state
        .store()
        .update_app(&app_id, &user.id, update)
        .await?
        .ok_or_else(ApiError::app_not_found)?;

    tracing::info!("App updated: {} by user {}", app.name, user.email);

    Ok(Json(ApiResponse::success(AppDto::from(app))))
}

/// DELETE /apps/{id}
/// Delete an app along with its deployments and logs
pub async fn delete_app(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(app_id): Path<String>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    let app = state
        .store()
        .get_app_owned(&app_id, &user.id)
        .await?
        .ok_or_else(ApiError::app_not_found)?;

    state.store().delete_app_cascade(&app.id).await?;

    tracing::info!("App deleted: {} by user {}", app.name, user.email);

    Ok(Json(ApiResponse::success(MessageDto {
        message: "App deleted successfully".to_string(),
    })))
}

/// POST /apps/{id}/start
pub async fn start_app(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(app_id): Path<String>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    set_runtime_status(&state, &user.id, &app_id, AppStatus::Running, "started").await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "App started successfully".to_string(),
    })))
}

/// POST /apps/{id}/stop
pub async fn stop_app(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(app_id): Path<String>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    set_runtime_status(&state, &user.id, &app_id, AppStatus::Stopped, "stopped").await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "App stopped successfully".to_string(),
    })))
}

/// POST /apps/{id}/restart
pub async fn restart_app(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(app_id): Path<String>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    set_runtime_status(&state, &user.id, &app_id, AppStatus::Running, "restarted").await?;

    Ok(Json(ApiResponse::success(MessageDto {
        message: "App restarted successfully".to_string(),
    })))
}

/// Shared start/stop/restart body: ownership check, status write, log line.
async fn set_runtime_status(
    state: &AppState,
    user_id: &str,
    app_id: &str,
    status: AppStatus,
    action: &str,
) -> Result<(), ApiError> {
    let app = state
        .store()
        .get_app_owned(app_id, user_id)
        .await?
        .ok_or_else(ApiError::app_not_found)?;

    state.store().set_app_status(&app.id, status).await?;

    state
        .store()
        .add_activity_log(
            Some(&app.id),
            None,
            None,
            "runtime",
            "info",
            &format!("App '{}' {action}", app.name),
        )
        .await?;

    tracing::info!("App {}: {}", action, app.name);
    Ok(())
}
