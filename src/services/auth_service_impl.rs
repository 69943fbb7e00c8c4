//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;

use crate::config::SecurityConfig;
use crate::db::{ApiKey, Store, User};
use crate::models::UserRole;
use crate::services::auth_service::{AuthError, AuthService};
use crate::services::token::{TokenKind, TokenPair, TokenService};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenService,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, tokens: TokenService, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }

    fn validate_signup(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
        if !(3..=50).contains(&username.len())
            || !username.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(AuthError::Validation(
                "Username must be 3-50 alphanumeric characters with optional underscores"
                    .to_string(),
            ));
        }

        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::Validation("Invalid email address".to_string()));
        }

        if password.len() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        Self::validate_signup(username, email, password)?;

        if self
            .store
            .user_identity_taken(Some(username), Some(email), None)
            .await?
        {
            return Err(AuthError::Conflict(
                "User with this email or username".to_string(),
            ));
        }

        let user = self
            .store
            .create_user(username, email, password, UserRole::User, &self.security)
            .await?;

        tracing::info!("New user created: {}", user.email);
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let is_valid = self.store.verify_user_password(email, password).await?;

        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        tracing::info!("User logged in: {}", user.email);
        self.tokens.issue_pair(&user.id)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.validate(refresh_token, TokenKind::Refresh)?;

        let user = self
            .store
            .get_user_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.tokens.issue_pair(&user.id)
    }

    async fn authenticate(&self, credential: &str) -> Result<User, AuthError> {
        // Session token first; any validation failure falls through to the
        // API key path so both credential shapes share one entry point.
        let user = match self.tokens.validate(credential, TokenKind::Access) {
            Ok(claims) => self.store.get_user_by_id(&claims.sub).await?,
            Err(_) => self.store.find_user_by_api_key(credential).await?,
        };

        let user = user.ok_or(AuthError::Unauthenticated)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(user)
    }

    fn authorize_admin(&self, user: &User) -> Result<(), AuthError> {
        if user.role == UserRole::Admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    async fn create_api_key(&self, user_id: &str, name: &str) -> Result<ApiKey, AuthError> {
        if name.is_empty() || name.len() > 100 {
            return Err(AuthError::Validation(
                "API key name must be 1-100 characters".to_string(),
            ));
        }

        let key = self
            .store
            .add_api_key(user_id, name, &self.security)
            .await?;

        tracing::info!("API key created for user: {user_id}");
        Ok(key)
    }

    async fn list_api_keys(&self, user_id: &str) -> Result<Vec<ApiKey>, AuthError> {
        Ok(self.store.list_api_keys(user_id).await?)
    }

    async fn delete_api_key(&self, user_id: &str, key_id: &str) -> Result<(), AuthError> {
        let deleted = self.store.delete_api_key(user_id, key_id).await?;

        if !deleted {
            return Err(AuthError::NotFound("API key".to_string()));
        }

        tracing::info!("API key deleted for user: {user_id}");
        Ok(())
    }
}
