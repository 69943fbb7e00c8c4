use std::sync::Arc;

use crate::api::RateLimiter;
use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, DeploymentPipeline, SeaOrmAuthService, TokenService};

/// Everything the request handlers and background worker share.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub token_service: TokenService,

    pub auth_service: Arc<dyn AuthService>,

    pub pipeline: DeploymentPipeline,

    pub rate_limiter: Arc<RateLimiter>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let token_service = TokenService::from_config(&config.security);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            token_service.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + 'static>;

        let pipeline = DeploymentPipeline::start(store.clone(), config.platform.pipeline_queue_size);

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            config,
            store,
            token_service,
            auth_service,
            pipeline,
            rate_limiter,
        })
    }
}
