//! Domain service for authentication and authorization.
//!
//! Resolves bearer credentials (session token or API key) to users,
//! handles signup/login, and gates admin-only operations.

use thiserror::Error;

use crate::db::{ApiKey, User};
use crate::services::token::TokenPair;

/// Errors specific to authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, invalid or expired credential.
    #[error("Could not validate credentials")]
    Unauthenticated,

    /// Credential resolved to a user whose account is disabled.
    #[error("User account is disabled")]
    AccountDisabled,

    /// Valid account without the required role.
    #[error("Admin access required")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] when the username or email is taken
    /// and [`AuthError::Validation`] for malformed input.
    async fn signup(&self, username: &str, email: &str, password: &str)
    -> Result<User, AuthError>;

    /// Verify email + password and mint a session token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on a bad email/password and
    /// [`AuthError::AccountDisabled`] for inactive accounts.
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Exchange a refresh token for a fresh token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Resolve one opaque bearer credential to a user: session token first,
    /// API key fallback.
    async fn authenticate(&self, credential: &str) -> Result<User, AuthError>;

    /// Gate an operation on the admin role.
    fn authorize_admin(&self, user: &User) -> Result<(), AuthError>;

    /// Create a named API key; the returned record carries the full secret
    /// exactly once.
    async fn create_api_key(&self, user_id: &str, name: &str) -> Result<ApiKey, AuthError>;

    /// List the user's API keys with masked secrets.
    async fn list_api_keys(&self, user_id: &str) -> Result<Vec<ApiKey>, AuthError>;

    /// Delete an API key owned by the user.
    async fn delete_api_key(&self, user_id: &str, key_id: &str) -> Result<(), AuthError>;
}
