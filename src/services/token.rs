//! Signed session tokens (access + refresh) for stateless authentication.
//!
//! Validity is fully determined by signature and expiry; there is no
//! revocation list, so a leaked token stays valid until it expires.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::services::auth_service::AuthError;

/// Distinguishes the two token variants so a refresh token can never be
/// replayed where an access token is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id
    pub sub: String,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

/// Access + refresh pair handed out on login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

#[derive(Clone)]
pub struct TokenService {
    secret: Arc<String>,
    access_minutes: i64,
    refresh_days: i64,
}

impl TokenService {
    /// Build from config. An empty configured secret gets replaced with a
    /// random ephemeral one, which invalidates all tokens on restart.
    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        let secret = if config.jwt_secret.is_empty() {
            tracing::warn!(
                "No jwt_secret configured; using an ephemeral secret, sessions will not survive a restart"
            );
            generate_secret()
        } else {
            config.jwt_secret.clone()
        };

        Self {
            secret: Arc::new(secret),
            access_minutes: config.access_token_minutes,
            refresh_days: config.refresh_token_days,
        }
    }

    /// Mint the access/refresh pair for a user.
    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair, AuthError> {
        let access = self.sign(user_id, TokenKind::Access, Duration::minutes(self.access_minutes))?;
        let refresh = self.sign(user_id, TokenKind::Refresh, Duration::days(self.refresh_days))?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
            token_type: "bearer",
        })
    }

    fn sign(&self, user_id: &str, kind: TokenKind, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("Failed to encode session token: {}", e);
            AuthError::Internal("Failed to sign token".to_string())
        })
    }

    /// Validate signature, expiry and kind. Any mismatch is reported as
    /// `Unauthenticated` so callers cannot distinguish failure causes.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            AuthError::Unauthenticated
        })?;

        if claims.kind != expected {
            return Err(AuthError::Unauthenticated);
        }

        Ok(claims)
    }
}

/// Random 48-char secret for processes started without one configured.
fn generate_secret() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        let config = SecurityConfig {
            jwt_secret: "test-secret-key-at-least-32-characters-long".to_string(),
            ..SecurityConfig::default()
        };
        TokenService::from_config(&config)
    }

    #[test]
    fn test_issue_and_validate_pair() {
        let service = service();
        let pair = service.issue_pair("user-1").unwrap();

        let access = service.validate(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(access.sub, "user-1");
        assert_eq!(access.kind, TokenKind::Access);

        let refresh = service
            .validate(&pair.refresh_token, TokenKind::Refresh)
            .unwrap();
        assert_eq!(refresh.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let service = service();
        let pair = service.issue_pair("user-1").unwrap();

        assert!(matches!(
            service.validate(&pair.refresh_token, TokenKind::Access),
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            service.validate(&pair.access_token, TokenKind::Refresh),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = TokenService {
            secret: Arc::new("test-secret-key-at-least-32-characters-long".to_string()),
            access_minutes: -5,
            refresh_days: 7,
        };

        let pair = service.issue_pair("user-1").unwrap();
        assert!(matches!(
            service.validate(&pair.access_token, TokenKind::Access),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_garbage_and_api_key_shapes_rejected() {
        let service = service();
        assert!(service.validate("not-a-token", TokenKind::Access).is_err());
        assert!(
            service
                .validate("sk_abcdefghijklmnopqrstuvwxyz012345", TokenKind::Access)
                .is_err()
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let pair = service().issue_pair("user-1").unwrap();

        let other = TokenService {
            secret: Arc::new("a-completely-different-signing-secret-here".to_string()),
            access_minutes: 60,
            refresh_days: 7,
        };
        assert!(other.validate(&pair.access_token, TokenKind::Access).is_err());
    }
}
