use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::{
    FunctionCreateRequest, FunctionDto, FunctionInvokeRequest, FunctionInvokeResultDto,
    FunctionUpdateRequest, MessageDto,
};
use super::validation::{validate_function_name, validate_timeout};
use super::{ApiError, ApiResponse, AppState};
use crate::db::FunctionUpdate;

fn function_not_found() -> ApiError {
    ApiError::NotFound("Function not found".to_string())
}

/// POST /functions
/// Create a serverless function
pub async fn create_function(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<FunctionCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_function_name(&payload.name)?;
    validate_timeout(payload.timeout)?;

    if state
        .store()
        .function_name_taken(&user.id, &payload.name)
        .await?
    {
        return Err(ApiError::Conflict(
            "Function with this name already exists".to_string(),
        ));
    }

    let base_domain = state.config().platform.base_domain.clone();

    let function = state
        .store()
        .create_function(
            &user.id,
            &payload.name,
            payload.runtime,
            &payload.code,
            &payload.handler,
            &payload.env_vars,
            payload.timeout,
            &base_domain,
        )
        .await?;

    tracing::info!("Function created: {} by user {}", function.name, user.email);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(FunctionDto::from(function))),
    ))
}

/// GET /functions
pub async fn list_functions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<FunctionDto>>>, ApiError> {
    let functions = state.store().list_functions_for_user(&user.id).await?;

    Ok(Json(ApiResponse::success(
        functions.into_iter().map(FunctionDto::from).collect(),
    )))
}

/// GET /functions/{id}
pub async fn get_function(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(function_id): Path<String>,
) -> Result<Json<ApiResponse<FunctionDto>>, ApiError> {
    let function = state
        .store()
        .get_function_owned(&function_id, &user.id)
        .await?
        .ok_or_else(function_not_found)?;

    Ok(Json(ApiResponse::success(FunctionDto::from(function))))
}

/// PATCH /functions/{id}
pub async fn update_function(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(function_id): Path<String>,
    Json(payload): Json<FunctionUpdateRequest>,
) -> Result<Json<ApiResponse<FunctionDto>>, ApiError> {
    if let Some(timeout) = payload.timeout {
        validate_timeout(timeout)?;
    }

    let update = FunctionUpdate {
        code: payload.code,
        env_vars: payload.env_vars,
        timeout: payload.timeout,
    };

    let function = state
        .store()
        .update_function(&function_id, &user.id, update)
        .await?
        .ok_or_else(function_not_found)?;

    tracing::info!("Function updated: {} by user {}", function.name, user.email);

    Ok(Json(ApiResponse::success(FunctionDto::from(function))))
}

/// DELETE /functions/{id}
pub async fn delete_function(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(function_id): Path<String>,
) -> Result<Json<ApiResponse<MessageDto>>, ApiError> {
    let deleted = state.store().delete_function(&function_id, &user.id).await?;

    if !deleted {
        return Err(function_not_found());
    }

    tracing::info!("Function deleted: {function_id} by user {}", user.email);

    Ok(Json(ApiResponse::success(MessageDto {
        message: "Function deleted successfully".to_string(),
    })))
}

/// POST /functions/{id}/invoke
/// Simulated execution; a real runtime would run the stored code here.
pub async fn invoke_function(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(function_id): Path<String>,
    Json(payload): Json<FunctionInvokeRequest>,
) -> Result<Json<ApiResponse<FunctionInvokeResultDto>>, ApiError> {
    let function = state
        .store()
        .get_function_owned(&function_id, &user.id)
        .await?
        .ok_or_else(function_not_found)?;

    let result = FunctionInvokeResultDto {
        function_id: function.id.clone(),
        status: "success".to_string(),
        execution_time_ms: 125,
        output: serde_json::json!({
            "message": format!("Function {} executed successfully", function.name),
            "payload": payload.payload,
        }),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    state
        .store()
        .add_activity_log(
            None,
            None,
            Some(&function.id),
            "function_execution",
            "info",
            &format!("Function {} invoked", function.name),
        )
        .await?;

    tracing::info!("Function invoked: {} by user {}", function.name, user.email);

    Ok(Json(ApiResponse::success(result)))
}
