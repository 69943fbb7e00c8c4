use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub rate_limit: RateLimitConfig,

    pub platform: PlatformConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            platform: PlatformConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/skydock.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HS256 signing secret for session tokens. When empty an ephemeral
    /// secret is generated at startup and all tokens die with the process.
    pub jwt_secret: String,

    /// Access token validity window in minutes.
    pub access_token_minutes: i64,

    /// Refresh token validity window in days.
    pub refresh_token_days: i64,

    /// Length of the random portion of generated API keys.
    pub api_key_length: usize,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            api_key_length: 32,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Max requests per client within the window.
    pub max_requests: usize,

    /// Trailing window length in seconds.
    pub window_seconds: u64,

    /// Route exempt from limiting (not counted either).
    pub exempt_path: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_seconds: 60,
            exempt_path: "/health".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Domain suffix for generated app and function URLs.
    pub base_domain: String,

    pub max_apps_per_user: u64,

    /// Pipeline queue capacity before `schedule` reports backpressure.
    pub pipeline_queue_size: usize,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_domain: "skydock.app".to_string(),
            max_apps_per_user: 10,
            pipeline_queue_size: 64,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("skydock").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".skydock").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.access_token_minutes <= 0 {
            anyhow::bail!("Access token lifetime must be > 0 minutes");
        }

        if self.security.refresh_token_days <= 0 {
            anyhow::bail!("Refresh token lifetime must be > 0 days");
        }

        if self.security.api_key_length < 16 {
            anyhow::bail!("API key length must be at least 16 characters");
        }

        if self.rate_limit.enabled && self.rate_limit.max_requests == 0 {
            anyhow::bail!("Rate limit quota must be > 0 when limiting is enabled");
        }

        if self.rate_limit.enabled && self.rate_limit.window_seconds == 0 {
            anyhow::bail!("Rate limit window must be > 0 seconds when limiting is enabled");
        }

        if self.platform.max_apps_per_user == 0 {
            anyhow::bail!("Max apps per user must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert_eq!(config.security.access_token_minutes, 60);
        assert_eq!(config.security.refresh_token_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[rate_limit]"));
        assert!(toml_str.contains("[platform]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [rate_limit]
            max_requests = 5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.rate_limit.max_requests, 5);

        assert_eq!(config.platform.base_domain, "skydock.app");
    }

    #[test]
    fn test_validate_rejects_zero_quota() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());
    }
}
