//! End-to-end coverage of the deployment lifecycle: create an app, trigger
//! a deployment, and watch the background pipeline drive it to a terminal
//! state while the owning app mirrors the outcome.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use skydock::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.jwt_secret = "integration-test-secret-0123456789abcdef".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app() -> (Arc<skydock::api::AppState>, Router) {
    let state = skydock::api::create_app_state_from_config(test_config())
        .await
        .expect("Failed to create app state");
    let router = skydock::api::router(state.clone());
    (state, router)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn login_token(app: &Router) -> String {
    let signup = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/signup")
        .header("Content-Type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "username": "deployer",
                "email": "deployer@example.com",
                "password": "hunter2hunter2"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(signup).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let login = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "email": "deployer@example.com",
                "password": "hunter2hunter2"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["data"]["access_token"].as_str().unwrap().to_string()
}

async fn create_app_record(app: &Router, token: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/apps",
            token,
            serde_json::json!({
                "name": "demo-api",
                "source_type": "github",
                "source_config": { "repo_url": "https://github.com/acme/demo-api" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    assert!(
        body["data"]["url"]
            .as_str()
            .unwrap()
            .starts_with("https://demo-api-")
    );
    body["data"]["id"].as_str().unwrap().to_string()
}

/// Poll a deployment until it reaches a terminal state.
async fn wait_for_completion(
    app: &Router,
    token: &str,
    deployment_id: &str,
) -> serde_json::Value {
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/deployments/{deployment_id}"))
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let status = body["data"]["status"].as_str().unwrap();

        // Readers must never see a completion timestamp on a record that
        // is still in flight.
        if status == "running" || status == "failed" {
            assert!(!body["data"]["completed_at"].is_null());
            return body["data"].clone();
        }
        assert!(body["data"]["completed_at"].is_null());

        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    panic!("deployment {deployment_id} never reached a terminal state");
}

#[tokio::test]
async fn test_deployment_runs_to_completion() {
    let (_, app) = spawn_app().await;
    let token = login_token(&app).await;
    let app_id = create_app_record(&app, &token).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/deployments",
            &token,
            serde_json::json!({ "app_id": app_id, "commit_sha": "abc123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    // The triggering request returns before the pipeline touches the record.
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["completed_at"].is_null());
    assert_eq!(body["data"]["logs"][0], "Deployment initiated");
    let deployment_id = body["data"]["id"].as_str().unwrap().to_string();

    let finished = wait_for_completion(&app, &token, &deployment_id).await;
    assert_eq!(finished["status"], "running");

    let logs = finished["logs"].as_array().unwrap();
    assert!(logs.len() > 1);
    assert_eq!(
        logs.last().unwrap().as_str().unwrap(),
        "Deployment completed successfully"
    );

    // The owning app mirrors the deployment's terminal status.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/apps/{app_id}"))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], finished["status"]);
}

#[tokio::test]
async fn test_deployment_requires_owned_app() {
    let (_, app) = spawn_app().await;
    let token = login_token(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/deployments",
            &token,
            serde_json::json!({ "app_id": "no-such-app" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deployments_listed_newest_first() {
    let (_, app) = spawn_app().await;
    let token = login_token(&app).await;
    let app_id = create_app_record(&app, &token).await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/deployments",
                &token,
                serde_json::json!({ "app_id": app_id }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/deployments?app_id={app_id}"))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_pipeline_fault_does_not_poison_worker() {
    let (state, app) = spawn_app().await;
    let token = login_token(&app).await;
    let app_id = create_app_record(&app, &token).await;

    // A job for a record that does not exist fails inside the worker; the
    // fault must stay contained there.
    state
        .pipeline()
        .schedule("ghost-deployment", "ghost-app")
        .expect("scheduling is fire-and-forget");

    // A legitimate deployment scheduled right behind it still completes.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/deployments",
            &token,
            serde_json::json!({ "app_id": app_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let deployment_id = body["data"]["id"].as_str().unwrap().to_string();

    let finished = wait_for_completion(&app, &token, &deployment_id).await;
    assert_eq!(finished["status"], "running");
}
