use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::models::{AppStatus, FunctionRuntime, SourceType, UserRole};

pub mod migrator;
pub mod repositories;

pub use crate::entities::activity_logs::Model as ActivityLog;
pub use repositories::app::{App, AppUpdate};
pub use repositories::deployment::Deployment;
pub use repositories::function::{Function, FunctionUpdate};
pub use repositories::logs::LogFilter;
pub use repositories::user::{ApiKey, User};

/// Counts reported by the admin stats endpoint.
#[derive(Debug, Clone, Copy)]
pub struct PlatformCounts {
    pub users: u64,
    pub apps: u64,
    pub deployments: u64,
    pub functions: u64,
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn app_repo(&self) -> repositories::app::AppRepository {
        repositories::app::AppRepository::new(self.conn.clone())
    }

    fn deployment_repo(&self) -> repositories::deployment::DeploymentRepository {
        repositories::deployment::DeploymentRepository::new(self.conn.clone())
    }

    fn function_repo(&self) -> repositories::function::FunctionRepository {
        repositories::function::FunctionRepository::new(self.conn.clone())
    }

    fn logs_repo(&self) -> repositories::logs::LogRepository {
        repositories::logs::LogRepository::new(self.conn.clone())
    }

    // ------------------------------------------------------------------
    // Users & credentials
    // ------------------------------------------------------------------

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password, role, config)
            .await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn user_identity_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        self.user_repo()
            .identity_taken(username, email, exclude_id)
            .await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn update_user_profile(
        &self,
        id: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>> {
        self.user_repo().update_profile(id, username, email).await
    }

    pub async fn update_user_admin_fields(
        &self,
        id: &str,
        is_active: Option<bool>,
        role: Option<UserRole>,
    ) -> Result<Option<User>> {
        self.user_repo()
            .update_admin_fields(id, is_active, role)
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    /// Delete a user and everything they own.
    pub async fn delete_user_cascade(&self, user_id: &str) -> Result<()> {
        let app_ids = self.app_repo().delete_for_user(user_id).await?;
        self.logs_repo().delete_for_apps(&app_ids).await?;
        self.deployment_repo().delete_for_user(user_id).await?;
        self.function_repo().delete_for_user(user_id).await?;
        self.user_repo().delete_api_keys_for_user(user_id).await?;
        self.user_repo().delete(user_id).await?;
        Ok(())
    }

    pub async fn add_api_key(
        &self,
        user_id: &str,
        name: &str,
        config: &SecurityConfig,
    ) -> Result<ApiKey> {
        self.user_repo().add_api_key(user_id, name, config).await
    }

    pub async fn list_api_keys(&self, user_id: &str) -> Result<Vec<ApiKey>> {
        self.user_repo().list_api_keys(user_id).await
    }

    pub async fn delete_api_key(&self, user_id: &str, key_id: &str) -> Result<bool> {
        self.user_repo().delete_api_key(user_id, key_id).await
    }

    pub async fn find_user_by_api_key(&self, key: &str) -> Result<Option<User>> {
        self.user_repo().find_by_api_key(key).await
    }

    // ------------------------------------------------------------------
    // Apps
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn create_app(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        source_type: SourceType,
        source_config: &serde_json::Value,
        env_vars: &HashMap<String, String>,
        base_domain: &str,
    ) -> Result<App> {
        self.app_repo()
            .create(
                user_id,
                name,
                description,
                source_type,
                source_config,
                env_vars,
                base_domain,
            )
            .await
    }

    pub async fn get_app_owned(&self, id: &str, user_id: &str) -> Result<Option<App>> {
        self.app_repo().get_owned(id, user_id).await
    }

    pub async fn list_apps_for_user(&self, user_id: &str) -> Result<Vec<App>> {
        self.app_repo().list_for_user(user_id).await
    }

    pub async fn count_apps_for_user(&self, user_id: &str) -> Result<u64> {
        self.app_repo().count_for_user(user_id).await
    }

    pub async fn app_name_taken(&self, user_id: &str, name: &str) -> Result<bool> {
        self.app_repo().name_taken(user_id, name).await
    }

    pub async fn update_app(&self, id: &str, user_id: &str, update: AppUpdate) -> Result<Option<App>> {
        self.app_repo().update(id, user_id, update).await
    }

    pub async fn set_app_status(&self, id: &str, status: AppStatus) -> Result<()> {
        self.app_repo().set_status(id, status).await
    }

    /// Delete an app and its deployments and logs.
    pub async fn delete_app_cascade(&self, app_id: &str) -> Result<()> {
        self.app_repo().delete(app_id).await?;
        self.deployment_repo().delete_for_app(app_id).await?;
        self.logs_repo().delete_for_app(app_id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deployments
    // ------------------------------------------------------------------

    pub async fn create_deployment(
        &self,
        app_id: &str,
        user_id: &str,
        commit_sha: Option<&str>,
        docker_image: Option<&str>,
    ) -> Result<Deployment> {
        self.deployment_repo()
            .create(app_id, user_id, commit_sha, docker_image)
            .await
    }

    pub async fn get_deployment_owned(&self, id: &str, user_id: &str) -> Result<Option<Deployment>> {
        self.deployment_repo().get_owned(id, user_id).await
    }

    pub async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>> {
        self.deployment_repo().get(id).await
    }

    pub async fn list_deployments_for_user(
        &self,
        user_id: &str,
        app_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Deployment>> {
        self.deployment_repo()
            .list_for_user(user_id, app_id, limit)
            .await
    }

    pub async fn set_deployment_status(&self, id: &str, status: AppStatus) -> Result<()> {
        self.deployment_repo().set_status(id, status).await
    }

    pub async fn append_deployment_log(&self, id: &str, line: &str) -> Result<()> {
        self.deployment_repo().append_log(id, line).await
    }

    pub async fn complete_deployment(&self, id: &str, status: AppStatus) -> Result<()> {
        self.deployment_repo().complete(id, status).await
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn create_function(
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
        self.function_repo()
            .create(
                user_id,
                name,
                runtime,
                code,
                handler,
                env_vars,
                timeout,
                base_domain,
            )
            .await
    }

    pub async fn get_function_owned(&self, id: &str, user_id: &str) -> Result<Option<Function>> {
        self.function_repo().get_owned(id, user_id).await
    }

    pub async fn list_functions_for_user(&self, user_id: &str) -> Result<Vec<Function>> {
        self.function_repo().list_for_user(user_id).await
    }

    pub async fn function_name_taken(&self, user_id: &str, name: &str) -> Result<bool> {
        self.function_repo().name_taken(user_id, name).await
    }

    pub async fn update_function(
        &self,
        id: &str,
        user_id: &str,
        update: FunctionUpdate,
    ) -> Result<Option<Function>> {
        self.function_repo().update(id, user_id, update).await
    }

    pub async fn delete_function(&self, id: &str, user_id: &str) -> Result<bool> {
        self.function_repo().delete(id, user_id).await
    }

    // ------------------------------------------------------------------
    // Activity logs & stats
    // ------------------------------------------------------------------

    pub async fn add_activity_log(
        &self,
        app_id: Option<&str>,
        deployment_id: Option<&str>,
        function_id: Option<&str>,
        log_type: &str,
        level: &str,
        message: &str,
    ) -> Result<()> {
        self.logs_repo()
            .add(app_id, deployment_id, function_id, log_type, level, message)
            .await
    }

    pub async fn query_activity_logs(&self, filter: &LogFilter) -> Result<Vec<ActivityLog>> {
        self.logs_repo().query(filter).await
    }

    pub async fn platform_counts(&self) -> Result<PlatformCounts> {
        Ok(PlatformCounts {
            users: self.user_repo().count().await?,
            apps: self.app_repo().count().await?,
            deployments: self.deployment_repo().count().await?,
            functions: self.function_repo().count().await?,
        })
    }
}
