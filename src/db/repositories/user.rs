use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{api_keys, users};
use crate::models::UserRole;

/// User data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        let role = UserRole::parse(&model.role).unwrap_or(UserRole::User);
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// An API key record. `key` holds the full secret only when freshly created;
/// listings carry the masked form instead.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub key: String,
    pub created_at: String,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user, hashing the password off the async runtime.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
        config: &SecurityConfig,
    ) -> Result<User> {
        let password = password.to_string();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();
        let model = users::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            role: Set(role.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(inserted))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// True when another user already holds the given username or email.
    pub async fn identity_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        if username.is_none() && email.is_none() {
            return Ok(false);
        }

        let mut identity = Condition::any();
        if let Some(username) = username {
            identity = identity.add(users::Column::Username.eq(username));
        }
        if let Some(email) = email {
            identity = identity.add(users::Column::Email.eq(email));
        }

        let mut condition = Condition::all().add(identity);
        if let Some(id) = exclude_id {
            condition = condition.add(users::Column::Id.ne(id));
        }

        let count = users::Entity::find()
            .filter(condition)
            .count(&self.conn)
            .await
            .context("Failed to check identity uniqueness")?;

        Ok(count > 0)
    }

    /// Verify a password against the stored hash for the given email.
    /// Note: runs under `spawn_blocking` because Argon2 verification is
    /// CPU-intensive and would block the async runtime if run directly.
    /// A missing user and a malformed hash both come back as `false`.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let Ok(parsed_hash) = PasswordHash::new(&password_hash) else {
                return false;
            };

            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        })
        .await
        .context("Password verification task panicked")?;

        Ok(is_valid)
    }

    pub async fn update_profile(
        &self,
        id: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for profile update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(username) = username {
            active.username = Set(username.to_string());
        }
        if let Some(email) = email {
            active.email = Set(email.to_string());
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await?;
        Ok(Some(User::from(updated)))
    }

    /// Admin-only update of the active flag and role.
    pub async fn update_admin_fields(
        &self,
        id: &str,
        is_active: Option<bool>,
        role: Option<UserRole>,
    ) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for admin update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(is_active) = is_active {
            active.is_active = Set(is_active);
        }
        if let Some(role) = role {
            active.role = Set(role.as_str().to_string());
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await?;
        Ok(Some(User::from(updated)))
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }

    /// Create an API key for the user. The returned record carries the
    /// full secret; this is the only time it is ever exposed.
    pub async fn add_api_key(
        &self,
        user_id: &str,
        name: &str,
        config: &SecurityConfig,
    ) -> Result<ApiKey> {
        let key = generate_api_key(config.api_key_length);
        let now = chrono::Utc::now().to_rfc3339();

        let model = api_keys::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            name: Set(name.to_string()),
            key: Set(key.clone()),
            created_at: Set(now.clone()),
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert API key")?;

        Ok(ApiKey {
            id: inserted.id,
            name: inserted.name,
            key,
            created_at: inserted.created_at,
        })
    }

    /// List the user's API keys with masked secrets.
    pub async fn list_api_keys(&self, user_id: &str) -> Result<Vec<ApiKey>> {
        let keys = api_keys::Entity::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to list API keys")?;

        Ok(keys
            .into_iter()
            .map(|k| ApiKey {
                id: k.id,
                name: k.name,
                key: mask_api_key(&k.key),
                created_at: k.created_at,
            })
            .collect())
    }

    pub async fn delete_api_key(&self, user_id: &str, key_id: &str) -> Result<bool> {
        let result = api_keys::Entity::delete_many()
            .filter(api_keys::Column::UserId.eq(user_id))
            .filter(api_keys::Column::Id.eq(key_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete API key")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete_api_keys_for_user(&self, user_id: &str) -> Result<()> {
        api_keys::Entity::delete_many()
            .filter(api_keys::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete API keys for user")?;

        Ok(())
    }

    /// Exact-match lookup of an opaque API key secret to its owning user.
    pub async fn find_by_api_key(&self, key: &str) -> Result<Option<User>> {
        let Some(record) = api_keys::Entity::find()
            .filter(api_keys::Column::Key.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query API key")?
        else {
            return Ok(None);
        };

        self.get_by_id(&record.user_id).await
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random API key: recognizable "sk_" prefix plus an
/// alphanumeric secret of the configured length.
#[must_use]
pub fn generate_api_key(length: usize) -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();

    format!("sk_{secret}")
}

/// Mask an API key for listings: first 10 and last 4 characters visible.
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= 14 {
        return "***".to_string();
    }
    format!("{}...{}", &key[..10], &key[key.len() - 4..])
}
