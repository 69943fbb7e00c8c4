pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService};
pub use auth_service_impl::SeaOrmAuthService;

pub mod token;
pub use token::{TokenKind, TokenPair, TokenService};

pub mod pipeline;
pub use pipeline::{DeploymentPipeline, PipelineError};
