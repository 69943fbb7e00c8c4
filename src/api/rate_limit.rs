//! Per-client sliding-window request admission.
//!
//! State lives in process memory: a map from client identifier to the
//! timestamps of its requests inside the trailing window. Under multiple
//! instances each process enforces its own quota; swapping in a shared
//! store behind `admit` would change that without touching callers.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use super::{ApiError, AppState};
use crate::config::RateLimitConfig;

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject a request arriving now.
    pub async fn admit(&self, client_id: &str) -> bool {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        self.admit_at(client_id, now_ms).await
    }

    /// Admission check at an explicit clock reading (milliseconds).
    ///
    /// The lock spans prune, check and append: two concurrent requests at
    /// the quota boundary serialize here, so the last slot is handed out
    /// exactly once. A rejected request leaves the window untouched.
    pub async fn admit_at(&self, client_id: &str, now_ms: u64) -> bool {
        if !self.config.enabled {
            return true;
        }

        let window_ms = self.config.window_seconds.saturating_mul(1000);

        let mut windows = self.windows.lock().await;
        let entries = windows.entry(client_id.to_string()).or_default();

        while let Some(&oldest) = entries.front() {
            if now_ms.saturating_sub(oldest) >= window_ms {
                entries.pop_front();
            } else {
                break;
            }
        }

        if entries.len() >= self.config.max_requests {
            return false;
        }

        entries.push_back(now_ms);
        true
    }

    #[must_use]
    pub fn exempt_path(&self) -> &str {
        &self.config.exempt_path
    }
}

/// Middleware evaluated before any handler logic. The health route passes
/// through without being counted.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let limiter = state.rate_limiter();

    if request.uri().path() == limiter.exempt_path() {
        return Ok(next.run(request).await);
    }

    let client_id = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string());

    if limiter.admit(&client_id).await {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(client = %client_id, "Rate limit exceeded");
        Err(ApiError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            max_requests,
            window_seconds,
            exempt_path: "/health".to_string(),
        })
    }

    #[tokio::test]
    async fn test_quota_within_window() {
        let limiter = limiter(3, 60);

        assert!(limiter.admit_at("1.2.3.4", 0).await);
        assert!(limiter.admit_at("1.2.3.4", 1_000).await);
        assert!(limiter.admit_at("1.2.3.4", 2_000).await);
        assert!(!limiter.admit_at("1.2.3.4", 3_000).await);

        // Old entries fall out of the trailing window.
        assert!(limiter.admit_at("1.2.3.4", 61_000).await);
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = limiter(1, 60);

        assert!(limiter.admit_at("1.2.3.4", 0).await);
        assert!(!limiter.admit_at("1.2.3.4", 1_000).await);
        assert!(limiter.admit_at("5.6.7.8", 1_000).await);
    }

    #[tokio::test]
    async fn test_rejection_does_not_consume_quota() {
        let limiter = limiter(2, 60);

        assert!(limiter.admit_at("c", 0).await);
        assert!(limiter.admit_at("c", 1_000).await);
        assert!(!limiter.admit_at("c", 2_000).await);
        assert!(!limiter.admit_at("c", 3_000).await);

        // Both original entries expire together; rejected attempts left
        // nothing behind.
        assert!(limiter.admit_at("c", 61_000).await);
        assert!(limiter.admit_at("c", 61_001).await);
    }

    #[tokio::test]
    async fn test_disabled_always_admits() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            max_requests: 1,
            window_seconds: 60,
            exempt_path: "/health".to_string(),
        });

        for _ in 0..10 {
            assert!(limiter.admit_at("c", 0).await);
        }
    }

    #[tokio::test]
    async fn test_concurrent_admission_at_quota_boundary() {
        let limiter = Arc::new(limiter(1, 60));

        let a = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.admit_at("c", 0).await })
        };
        let b = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.admit_at("c", 0).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a ^ b, "exactly one of two concurrent requests must win the last slot");
    }
}
