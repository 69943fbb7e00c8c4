use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::deployments;
use crate::models::AppStatus;

/// Deployment record as seen by services and handlers.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub id: String,
    pub app_id: String,
    pub user_id: String,
    pub status: AppStatus,
    pub commit_sha: Option<String>,
    pub docker_image: Option<String>,
    pub logs: Vec<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl From<deployments::Model> for Deployment {
    fn from(model: deployments::Model) -> Self {
        let status = AppStatus::parse(&model.status).unwrap_or(AppStatus::Pending);
        let logs = serde_json::from_str(&model.logs).unwrap_or_default();

        Self {
            id: model.id,
            app_id: model.app_id,
            user_id: model.user_id,
            status,
            commit_sha: model.commit_sha,
            docker_image: model.docker_image,
            logs,
            created_at: model.created_at,
            completed_at: model.completed_at,
        }
    }
}

pub struct DeploymentRepository {
    conn: DatabaseConnection,
}

impl DeploymentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a fresh deployment in `pending` with its initial log line.
    pub async fn create(
        &self,
        app_id: &str,
        user_id: &str,
        commit_sha: Option<&str>,
        docker_image: Option<&str>,
    ) -> Result<Deployment> {
        let now = chrono::Utc::now().to_rfc3339();
        let logs = vec!["Deployment initiated".to_string()];

        let model = deployments::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            app_id: Set(app_id.to_string()),
            user_id: Set(user_id.to_string()),
            status: Set(AppStatus::Pending.as_str().to_string()),
            commit_sha: Set(commit_sha.map(ToString::to_string)),
            docker_image: Set(docker_image.map(ToString::to_string)),
            logs: Set(serde_json::to_string(&logs)?),
            created_at: Set(now),
            completed_at: Set(None),
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert deployment")?;

        Ok(Deployment::from(inserted))
    }

    /// Get a deployment only if it belongs to the given user.
    pub async fn get_owned(&self, id: &str, user_id: &str) -> Result<Option<Deployment>> {
        let deployment = deployments::Entity::find_by_id(id)
            .filter(deployments::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query deployment")?;

        Ok(deployment.map(Deployment::from))
    }

    /// Unscoped lookup used by the pipeline worker.
    pub async fn get(&self, id: &str) -> Result<Option<Deployment>> {
        let deployment = deployments::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query deployment")?;

        Ok(deployment.map(Deployment::from))
    }

    /// List a user's deployments, newest first, optionally scoped to an app.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        app_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Deployment>> {
        let mut query = deployments::Entity::find()
            .filter(deployments::Column::UserId.eq(user_id))
            .order_by_desc(deployments::Column::CreatedAt)
            .limit(limit);

        if let Some(app_id) = app_id {
            query = query.filter(deployments::Column::AppId.eq(app_id));
        }

        let deployments = query
            .all(&self.conn)
            .await
            .context("Failed to list deployments")?;

        Ok(deployments.into_iter().map(Deployment::from).collect())
    }

    /// Move a deployment into a non-terminal state.
    pub async fn set_status(&self, id: &str, status: AppStatus) -> Result<()> {
        let Some(deployment) = deployments::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query deployment for status update")?
        else {
            anyhow::bail!("Deployment not found: {id}");
        };

        let mut active: deployments::ActiveModel = deployment.into();
        active.status = Set(status.as_str().to_string());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Append one log line to the deployment's log sequence.
    pub async fn append_log(&self, id: &str, line: &str) -> Result<()> {
        let Some(deployment) = deployments::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query deployment for log append")?
        else {
            anyhow::bail!("Deployment not found: {id}");
        };

        let mut logs: Vec<String> = serde_json::from_str(&deployment.logs).unwrap_or_default();
        logs.push(line.to_string());

        let mut active: deployments::ActiveModel = deployment.into();
        active.logs = Set(serde_json::to_string(&logs)?);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Move a deployment into a terminal state. Status and `completed_at`
    /// land in the same UPDATE so no reader ever observes a completion
    /// timestamp on a non-terminal record.
    pub async fn complete(&self, id: &str, status: AppStatus) -> Result<()> {
        debug_assert!(status.is_terminal());

        let Some(deployment) = deployments::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query deployment for completion")?
        else {
            anyhow::bail!("Deployment not found: {id}");
        };

        let mut active: deployments::ActiveModel = deployment.into();
        active.status = Set(status.as_str().to_string());
        active.completed_at = Set(Some(chrono::Utc::now().to_rfc3339()));
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn delete_for_app(&self, app_id: &str) -> Result<()> {
        deployments::Entity::delete_many()
            .filter(deployments::Column::AppId.eq(app_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete deployments for app")?;

        Ok(())
    }

    pub async fn delete_for_user(&self, user_id: &str) -> Result<()> {
        deployments::Entity::delete_many()
            .filter(deployments::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete deployments for user")?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        deployments::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count deployments")
    }
}
