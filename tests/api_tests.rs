use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use skydock::config::Config;
use tower::ServiceExt;

/// Seeded by the initial migration
const ADMIN_EMAIL: &str = "admin@skydock.app";
const ADMIN_PASSWORD: &str = "changeme123";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single connection keeps every query on the same in-memory database.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.jwt_secret = "integration-test-secret-0123456789abcdef".to_string();
    // Fast hashing; production defaults are heavier.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app() -> Router {
    let state = skydock::api::create_app_state_from_config(test_config())
        .await
        .expect("Failed to create app state");
    skydock::api::router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn signup_and_login(app: &Router, username: &str, email: &str) -> (String, String) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/signup",
            serde_json::json!({
                "username": username,
                "email": email,
                "password": "hunter2hunter2"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            serde_json::json!({ "email": email, "password": "hunter2hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    (
        body["data"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

async fn admin_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["data"]["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_protected_routes_require_credentials() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/apps")
                .header("X-Api-Key", "sk_not_a_real_key_at_all_000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_validation_and_conflicts() {
    let app = spawn_app().await;

    // Password too short
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/signup",
            serde_json::json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "short"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Bad username
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/signup",
            serde_json::json!({
                "username": "a!",
                "email": "alice@example.com",
                "password": "hunter2hunter2"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, _) = signup_and_login(&app, "alice", "alice@example.com").await;

    // Same email again
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/signup",
            serde_json::json!({
                "username": "alice2",
                "email": "alice@example.com",
                "password": "hunter2hunter2"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = spawn_app().await;

    let (access, _) = signup_and_login(&app, "bob", "bob@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            serde_json::json!({ "email": "bob@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/auth/me", &access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "bob");
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn test_refresh_rejects_access_tokens() {
    let app = spawn_app().await;

    let (access, refresh) = signup_and_login(&app, "carol", "carol@example.com").await;

    // An access token must not pass where a refresh token is expected.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/refresh",
            serde_json::json!({ "refresh_token": access }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/refresh",
            serde_json::json!({ "refresh_token": refresh }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let new_access = body["data"]["access_token"].as_str().unwrap();

    // A refresh token is not accepted as a bearer credential either.
    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/auth/me", &refresh))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/auth/me", new_access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_key_lifecycle() {
    let app = spawn_app().await;

    let (access, _) = signup_and_login(&app, "dave", "dave@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/api-keys")
                .header("Authorization", format!("Bearer {access}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "name": "ci" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let key = body["data"]["key"].as_str().unwrap().to_string();
    let key_id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(key.starts_with("sk_"));

    // The raw key authenticates as its owner
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header("X-Api-Key", key.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "dave");

    // Listings only ever expose the masked form
    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/auth/api-keys", &access))
        .await
        .unwrap();
    let body = body_json(response).await;
    let listed = body["data"][0]["key"].as_str().unwrap();
    assert_ne!(listed, key);
    assert!(listed.contains("..."));

    // Delete, then the key stops working
    let response = app
        .clone()
        .oneshot(bearer_request(
            "DELETE",
            &format!("/api/v1/auth/api-keys/{key_id}"),
            &access,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(bearer_request(
            "DELETE",
            &format!("/api/v1/auth/api-keys/{key_id}"),
            &access,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header("X-Api-Key", key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_gating_and_account_disable() {
    let app = spawn_app().await;

    let (user_access, _) = signup_and_login(&app, "eve", "eve@example.com").await;

    // Plain users cannot reach admin routes
    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/admin/users", &user_access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/admin/users", &admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let users = body["data"].as_array().unwrap();
    let eve = users
        .iter()
        .find(|u| u["username"] == "eve")
        .expect("eve should be listed");
    let eve_id = eve["id"].as_str().unwrap();

    // Disable the account; the still-valid token must now be refused
    // distinctly from a bad credential.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/v1/admin/users/{eve_id}"))
                .header("Authorization", format!("Bearer {admin}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "is_active": false }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/auth/me", &user_access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(bearer_request("GET", "/api/v1/admin/stats", &admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["total_users"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_health_and_root_are_public() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_rejects_over_quota() {
    let mut config = test_config();
    config.rate_limit.max_requests = 3;
    config.rate_limit.window_seconds = 60;

    let state = skydock::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    let app = skydock::api::router(state);

    // Without connection info every request shares one client bucket.
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // The health check bypasses the limiter even when exhausted.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
