use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::LogDto;
use super::validation::validate_limit;
use super::{ApiError, ApiResponse, AppState};
use crate::db::LogFilter;

const fn default_limit() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub app_id: Option<String>,
    pub deployment_id: Option<String>,
    pub function_id: Option<String>,
    pub log_type: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// GET /logs
/// Activity logs for the caller's resources. Without an explicit filter
/// the query covers all of the caller's apps.
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<LogQuery>,
) -> Result<Json<ApiResponse<Vec<LogDto>>>, ApiError> {
    let limit = validate_limit(query.limit)?;

    let app_ids = if let Some(app_id) = &query.app_id {
        // Filtering by app requires owning it.
        state
            .store()
            .get_app_owned(app_id, &user.id)
            .await?
            .ok_or_else(ApiError::app_not_found)?;

        Some(vec![app_id.clone()])
    } else if query.deployment_id.is_none() && query.function_id.is_none() {
        let apps = state.store().list_apps_for_user(&user.id).await?;
        Some(apps.into_iter().map(|a| a.id).collect())
    } else {
        None
    };

    let filter = LogFilter {
        app_ids,
        deployment_id: query.deployment_id.clone(),
        function_id: query.function_id.clone(),
        log_type: query.log_type.clone(),
        limit,
    };

    let logs = state.store().query_activity_logs(&filter).await?;

    Ok(Json(ApiResponse::success(
        logs.into_iter().map(LogDto::from).collect(),
    )))
}
