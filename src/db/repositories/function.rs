use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashMap;

use crate::entities::functions;
use crate::models::FunctionRuntime;

/// Serverless function record as seen by services and handlers.
#[derive(Debug, Clone)]
pub struct Function {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub runtime: FunctionRuntime,
    pub code: String,
    pub handler: String,
    pub env_vars: HashMap<String, String>,
    pub timeout: i32,
    pub endpoint: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<functions::Model> for Function {
    fn from(model: functions::Model) -> Self {
        let runtime = FunctionRuntime::parse(&model.runtime).unwrap_or(FunctionRuntime::Python);
        let env_vars = serde_json::from_str(&model.env_vars).unwrap_or_default();

        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            runtime,
            code: model.code,
            handler: model.handler,
            env_vars,
            timeout: model.timeout,
            endpoint: model.endpoint,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields a user may change after creation.
#[derive(Debug, Default)]
pub struct FunctionUpdate {
    pub code: Option<String>,
    pub env_vars: Option<HashMap<String, String>>,
    pub timeout: Option<i32>,
}

pub struct FunctionRepository {
    conn: DatabaseConnection,
}

impl FunctionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        runtime: FunctionRuntime,
        code: &str,
        handler: &str,
        env_vars: &HashMap<String, String>,
        timeout: i32,
        base_domain: &str,
    ) -> Result<Function> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let endpoint = function_endpoint(name, &id, base_domain);

        let model = functions::ActiveModel {
            id: Set(id),
            user_id: Set(user_id.to_string()),
            name: Set(name.to_string()),
            runtime: Set(runtime.as_str().to_string()),
            code: Set(code.to_string()),
            handler: Set(handler.to_string()),
            env_vars: Set(serde_json::to_string(env_vars)?),
            timeout: Set(timeout),
            endpoint: Set(endpoint),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert function")?;

        Ok(Function::from(inserted))
    }

    pub async fn get_owned(&self, id: &str, user_id: &str) -> Result<Option<Function>> {
        let function = functions::Entity::find_by_id(id)
            .filter(functions::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query function")?;

        Ok(function.map(Function::from))
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Function>> {
        let functions = functions::Entity::find()
            .filter(functions::Column::UserId.eq(user_id))
            .order_by_desc(functions::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list functions")?;

        Ok(functions.into_iter().map(Function::from).collect())
    }

    pub async fn name_taken(&self, user_id: &str, name: &str) -> Result<bool> {
        let count = functions::Entity::find()
            .filter(functions::Column::UserId.eq(user_id))
            .filter(functions::Column::Name.eq(name))
            .count(&self.conn)
            .await
            .context("Failed to check function name uniqueness")?;

        Ok(count > 0)
    }

    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        update: FunctionUpdate,
    ) -> Result<Option<Function>> {
        let Some(function) = functions::Entity::find_by_id(id)
            .filter(functions::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query function for update")?
        else {
            return Ok(None);
        };

        let mut active: functions::ActiveModel = function.into();
        if let Some(code) = update.code {
            active.code = Set(code);
        }
        if let Some(env_vars) = update.env_vars {
            active.env_vars = Set(serde_json::to_string(&env_vars)?);
        }
        if let Some(timeout) = update.timeout {
            active.timeout = Set(timeout);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await?;
        Ok(Some(Function::from(updated)))
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = functions::Entity::delete_many()
            .filter(functions::Column::Id.eq(id))
            .filter(functions::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete function")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete_for_user(&self, user_id: &str) -> Result<()> {
        functions::Entity::delete_many()
            .filter(functions::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete functions for user")?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        functions::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count functions")
    }
}

/// Generated invoke URL for a function.
#[must_use]
pub fn function_endpoint(name: &str, id: &str, base_domain: &str) -> String {
    let short = &id[..id.len().min(8)];
    format!("https://fn-{name}-{short}.{base_domain}/invoke")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_endpoint() {
        let url = function_endpoint("resize", "0a1b2c3d-4e5f", "skydock.app");
        assert_eq!(url, "https://fn-resize-0a1b2c3d.skydock.app/invoke");
    }
}
