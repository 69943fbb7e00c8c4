use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashMap;

use crate::entities::apps;
use crate::models::{AppStatus, SourceType};

/// Application record as seen by services and handlers.
#[derive(Debug, Clone)]
pub struct App {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: AppStatus,
    pub source_type: SourceType,
    pub source_config: serde_json::Value,
    pub env_vars: HashMap<String, String>,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<apps::Model> for App {
    fn from(model: apps::Model) -> Self {
        let status = AppStatus::parse(&model.status).unwrap_or(AppStatus::Pending);
        let source_type = SourceType::parse(&model.source_type).unwrap_or(SourceType::Script);
        let source_config =
            serde_json::from_str(&model.source_config).unwrap_or(serde_json::Value::Null);
        let env_vars = serde_json::from_str(&model.env_vars).unwrap_or_default();

        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            status,
            source_type,
            source_config,
            env_vars,
            url: model.url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields a user may change after creation.
#[derive(Debug, Default)]
pub struct AppUpdate {
    pub description: Option<String>,
    pub env_vars: Option<HashMap<String, String>>,
    pub status: Option<AppStatus>,
}

pub struct AppRepository {
    conn: DatabaseConnection,
}

impl AppRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        source_type: SourceType,
        source_config: &serde_json::Value,
        env_vars: &HashMap<String, String>,
        base_domain: &str,
    ) -> Result<App> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let url = app_url(name, &id, base_domain);

        let model = apps::ActiveModel {
            id: Set(id),
            user_id: Set(user_id.to_string()),
            name: Set(name.to_string()),
            description: Set(description.map(ToString::to_string)),
            status: Set(AppStatus::Pending.as_str().to_string()),
            source_type: Set(source_type.as_str().to_string()),
            source_config: Set(source_config.to_string()),
            env_vars: Set(serde_json::to_string(env_vars)?),
            url: Set(url),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert app")?;

        Ok(App::from(inserted))
    }

    /// Get an app only if it belongs to the given user.
    pub async fn get_owned(&self, id: &str, user_id: &str) -> Result<Option<App>> {
        let app = apps::Entity::find_by_id(id)
            .filter(apps::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query app")?;

        Ok(app.map(App::from))
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<App>> {
        let apps = apps::Entity::find()
            .filter(apps::Column::UserId.eq(user_id))
            .order_by_desc(apps::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list apps")?;

        Ok(apps.into_iter().map(App::from).collect())
    }

    pub async fn count_for_user(&self, user_id: &str) -> Result<u64> {
        apps::Entity::find()
            .filter(apps::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count apps for user")
    }

    pub async fn name_taken(&self, user_id: &str, name: &str) -> Result<bool> {
        let count = apps::Entity::find()
            .filter(apps::Column::UserId.eq(user_id))
            .filter(apps::Column::Name.eq(name))
            .count(&self.conn)
            .await
            .context("Failed to check app name uniqueness")?;

        Ok(count > 0)
    }

    pub async fn update(&self, id: &str, user_id: &str, update: AppUpdate) -> Result<Option<App>> {
        let Some(app) = apps::Entity::find_by_id(id)
            .filter(apps::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query app for update")?
        else {
            return Ok(None);
        };

        let mut active: apps::ActiveModel = app.into();
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(env_vars) = update.env_vars {
            active.env_vars = Set(serde_json::to_string(&env_vars)?);
        }
        if let Some(status) = update.status {
            active.status = Set(status.as_str().to_string());
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await?;
        Ok(Some(App::from(updated)))
    }

    /// Field-set status update used by the deployment pipeline and the
    /// start/stop/restart handlers.
    pub async fn set_status(&self, id: &str, status: AppStatus) -> Result<()> {
        let Some(app) = apps::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query app for status update")?
        else {
            anyhow::bail!("App not found: {id}");
        };

        let mut active: apps::ActiveModel = app.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = apps::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete app")?;

        Ok(result.rows_affected > 0)
    }

    /// Delete all apps for a user and return their ids so dependent
    /// records can be cleaned up.
    pub async fn delete_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = apps::Entity::find()
            .filter(apps::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to list apps for deletion")?
            .into_iter()
            .map(|a| a.id)
            .collect();

        apps::Entity::delete_many()
            .filter(apps::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete apps for user")?;

        Ok(ids)
    }

    pub async fn count(&self) -> Result<u64> {
        apps::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count apps")
    }
}

/// Generated public URL for an app: name plus a short id suffix keeps it
/// unique across users that picked the same name.
#[must_use]
pub fn app_url(name: &str, id: &str, base_domain: &str) -> String {
    let short = &id[..id.len().min(8)];
    format!("https://{name}-{short}.{base_domain}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_url() {
        let url = app_url("blog", "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9", "skydock.app");
        assert_eq!(url, "https://blog-0a1b2c3d.skydock.app");
    }
}
