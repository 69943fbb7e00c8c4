use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::{DeploymentCreateRequest, DeploymentDto};
use super::{ApiError, ApiResponse, AppState};

const LIST_LIMIT: u64 = 50;

#[derive(Debug, Deserialize)]
pub struct DeploymentListQuery {
    pub app_id: Option<String>,
}

/// POST /deployments
/// Create a deployment and hand it to the pipeline. The response returns
/// immediately with the record still `pending`; the pipeline advances it
/// in the background.
pub async fn create_deployment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<DeploymentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state
        .store()
        .get_app_owned(&payload.app_id, &user.id)
        .await?
        .ok_or_else(ApiError::app_not_found)?;

    let deployment = state
        .store()
        .create_deployment(
            &app.id,
            &user.id,
            payload.commit_sha.as_deref(),
            payload.docker_image.as_deref(),
        )
        .await?;

    state
        .pipeline()
        .schedule(&deployment.id, &app.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!("Deployment created: {} for app {}", deployment.id, app.name);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DeploymentDto::from(deployment))),
    ))
}

/// GET /deployments
/// List the caller's deployments, newest first
pub async fn list_deployments(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<DeploymentListQuery>,
) -> Result<Json<ApiResponse<Vec<DeploymentDto>>>, ApiError> {
    let deployments = state
        .store()
        .list_deployments_for_user(&user.id, query.app_id.as_deref(), LIST_LIMIT)
        .await?;

    Ok(Json(ApiResponse::success(
        deployments.into_iter().map(DeploymentDto::from).collect(),
    )))
}

/// GET /deployments/{id}
pub async fn get_deployment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(deployment_id): Path<String>,
) -> Result<Json<ApiResponse<DeploymentDto>>, ApiError> {
    let deployment = state
        .store()
        .get_deployment_owned(&deployment_id, &user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Deployment not found".to_string()))?;

    Ok(Json(ApiResponse::success(DeploymentDto::from(deployment))))
}
