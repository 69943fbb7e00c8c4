use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

mod admin;
mod apps;
pub mod auth;
mod deployments;
mod error;
mod functions;
mod logs;
pub mod rate_limit;
mod system;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use types::*;

use crate::db::Store;
use crate::services::{AuthService, DeploymentPipeline};

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn pipeline(&self) -> &DeploymentPipeline {
        &self.shared.pipeline
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.shared.rate_limiter
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
    }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh));

    let api_router = Router::new()
        .merge(create_protected_router(state.clone()))
        .merge(public_routes);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_routes = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", patch(admin::update_user))
        .route("/admin/stats", get(admin::stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_middleware,
        ));

    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/api-keys", post(auth::create_api_key))
        .route("/auth/api-keys", get(auth::list_api_keys))
        .route("/auth/api-keys/{id}", delete(auth::delete_api_key))
        .route("/users/me", patch(users::update_profile))
        .route("/users/me", delete(users::delete_account))
        .route("/apps", post(apps::create_app))
        .route("/apps", get(apps::list_apps))
        .route("/apps/{id}", get(apps::get_app))
        .route("/apps/{id}", patch(apps::update_app))
        .route("/apps/{id}", delete(apps::delete_app))
        .route("/apps/{id}/start", post(apps::start_app))
        .route("/apps/{id}/stop", post(apps::stop_app))
        .route("/apps/{id}/restart", post(apps::restart_app))
        .route("/deployments", post(deployments::create_deployment))
        .route("/deployments", get(deployments::list_deployments))
        .route("/deployments/{id}", get(deployments::get_deployment))
        .route("/functions", post(functions::create_function))
        .route("/functions", get(functions::list_functions))
        .route("/functions/{id}", get(functions::get_function))
        .route("/functions/{id}", patch(functions::update_function))
        .route("/functions/{id}", delete(functions::delete_function))
        .route("/functions/{id}/invoke", post(functions::invoke_function))
        .route("/logs", get(logs::get_logs))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
