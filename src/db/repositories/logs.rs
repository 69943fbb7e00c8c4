use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{activity_logs, prelude::*};

/// Filters for the activity log query endpoint.
#[derive(Debug, Default, Clone)]
pub struct LogFilter {
    pub app_ids: Option<Vec<String>>,
    pub deployment_id: Option<String>,
    pub function_id: Option<String>,
    pub log_type: Option<String>,
    pub limit: u64,
}

pub struct LogRepository {
    conn: DatabaseConnection,
}

impl LogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        app_id: Option<&str>,
        deployment_id: Option<&str>,
        function_id: Option<&str>,
        log_type: &str,
        level: &str,
        message: &str,
    ) -> Result<()> {
        let active_model = activity_logs::ActiveModel {
            app_id: Set(app_id.map(ToString::to_string)),
            deployment_id: Set(deployment_id.map(ToString::to_string)),
            function_id: Set(function_id.map(ToString::to_string)),
            log_type: Set(log_type.to_string()),
            level: Set(level.to_string()),
            message: Set(message.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        ActivityLogs::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert activity log")?;

        Ok(())
    }

    pub async fn query(&self, filter: &LogFilter) -> Result<Vec<activity_logs::Model>> {
        let mut query = ActivityLogs::find().order_by_desc(activity_logs::Column::CreatedAt);

        if let Some(app_ids) = &filter.app_ids {
            query = query.filter(activity_logs::Column::AppId.is_in(app_ids.clone()));
        }

        if let Some(deployment_id) = &filter.deployment_id {
            query = query.filter(activity_logs::Column::DeploymentId.eq(deployment_id));
        }

        if let Some(function_id) = &filter.function_id {
            query = query.filter(activity_logs::Column::FunctionId.eq(function_id));
        }

        if let Some(log_type) = &filter.log_type {
            query = query.filter(activity_logs::Column::LogType.eq(log_type));
        }

        let items = query
            .limit(filter.limit)
            .all(&self.conn)
            .await
            .context("Failed to query activity logs")?;

        Ok(items)
    }

    pub async fn delete_for_app(&self, app_id: &str) -> Result<()> {
        ActivityLogs::delete_many()
            .filter(activity_logs::Column::AppId.eq(app_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete logs for app")?;

        Ok(())
    }

    pub async fn delete_for_apps(&self, app_ids: &[String]) -> Result<()> {
        if app_ids.is_empty() {
            return Ok(());
        }

        ActivityLogs::delete_many()
            .filter(activity_logs::Column::AppId.is_in(app_ids.to_vec()))
            .exec(&self.conn)
            .await
            .context("Failed to delete logs for apps")?;

        Ok(())
    }
}
