use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::{ActivityLog, ApiKey, App, Deployment, Function, User};
use crate::models::{AppStatus, FunctionRuntime, SourceType, UserRole};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageDto {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiKeyDto {
    pub id: String,
    pub name: String,
    pub key: String,
    pub created_at: String,
}

impl From<ApiKey> for ApiKeyDto {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key: key.key,
            created_at: key.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub user_id: String,
    pub status: AppStatus,
    pub source_type: SourceType,
    pub source_config: serde_json::Value,
    pub env_vars: HashMap<String, String>,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<App> for AppDto {
    fn from(app: App) -> Self {
        Self {
            id: app.id,
            name: app.name,
            description: app.description,
            user_id: app.user_id,
            status: app.status,
            source_type: app.source_type,
            source_config: app.source_config,
            env_vars: app.env_vars,
            url: app.url,
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeploymentDto {
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

impl From<Deployment> for DeploymentDto {
    fn from(deployment: Deployment) -> Self {
        Self {
            id: deployment.id,
            app_id: deployment.app_id,
            user_id: deployment.user_id,
            status: deployment.status,
            commit_sha: deployment.commit_sha,
            docker_image: deployment.docker_image,
            logs: deployment.logs,
            created_at: deployment.created_at,
            completed_at: deployment.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FunctionDto {
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub runtime: FunctionRuntime,
    pub handler: String,
    pub env_vars: HashMap<String, String>,
    pub timeout: i32,
    pub endpoint: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Function> for FunctionDto {
    fn from(function: Function) -> Self {
        Self {
            id: function.id,
            name: function.name,
            user_id: function.user_id,
            runtime: function.runtime,
            handler: function.handler,
            env_vars: function.env_vars,
            timeout: function.timeout,
            endpoint: function.endpoint,
            created_at: function.created_at,
            updated_at: function.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogDto {
    pub id: i32,
    pub app_id: Option<String>,
    pub deployment_id: Option<String>,
    pub function_id: Option<String>,
    pub log_type: String,
    pub level: String,
    pub message: String,
    pub created_at: String,
}

impl From<ActivityLog> for LogDto {
    fn from(log: ActivityLog) -> Self {
        Self {
            id: log.id,
            app_id: log.app_id,
            deployment_id: log.deployment_id,
            function_id: log.function_id,
            log_type: log.log_type,
            level: log.level,
            message: log.message,
            created_at: log.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlatformStatsDto {
    pub total_users: u64,
    pub total_apps: u64,
    pub total_deployments: u64,
    pub total_functions: u64,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyCreateRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UserUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUserUpdateRequest {
    pub is_active: Option<bool>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct AppCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub source_type: SourceType,
    pub source_config: serde_json::Value,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct AppUpdateRequest {
    pub description: Option<String>,
    pub env_vars: Option<HashMap<String, String>>,
    pub status: Option<AppStatus>,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentCreateRequest {
    pub app_id: String,
    pub commit_sha: Option<String>,
    pub docker_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCreateRequest {
    pub name: String,
    pub runtime: FunctionRuntime,
    pub code: String,
    #[serde(default = "default_handler")]
    pub handler: String,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default = "default_timeout")]
    pub timeout: i32,
}

fn default_handler() -> String {
    "main".to_string()
}

const fn default_timeout() -> i32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct FunctionUpdateRequest {
    pub code: Option<String>,
    pub env_vars: Option<HashMap<String, String>>,
    pub timeout: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionInvokeRequest {
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FunctionInvokeResultDto {
    pub function_id: String,
    pub status: String,
    pub execution_time_ms: u64,
    pub output: serde_json::Value,
    pub timestamp: String,
}
