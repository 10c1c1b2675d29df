//! Route-level tests
//!
//! Exercise the HTTP surface with a fake process supervisor. Requests that
//! fail validation must be rejected before any filesystem or supervisor
//! side effect happens.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use secrecy::SecretString;
use serde_json::json;
use tower::ServiceExt;

use deploy_webhook::config::Config;
use deploy_webhook::deploy::supervisor::ProcessSupervisor;
use deploy_webhook::deploy::Deployer;
use deploy_webhook::errors::DeployError;
use deploy_webhook::github::client::GithubClient;
use deploy_webhook::server::serve::app;
use deploy_webhook::server::state::ServerState;

const SECRET: &str = "test-deploy-secret";

/// Supervisor fake that records restart calls
#[derive(Default)]
struct FakeSupervisor {
    calls: Mutex<Vec<String>>,
}

impl FakeSupervisor {
    fn restart_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessSupervisor for FakeSupervisor {
    async fn restart(&self, process_name: &str) -> Result<(), DeployError> {
        self.calls.lock().unwrap().push(process_name.to_string());
        Ok(())
    }
}

struct TestEnv {
    router: axum::Router,
    supervisor: Arc<FakeSupervisor>,
    backend_tst: PathBuf,
    frontend_prd: PathBuf,
}

fn test_env(root: &Path) -> TestEnv {
    let paths = HashMap::from([
        ("DEPLOY_SECRET_TOKEN", SECRET.to_string()),
        ("GITHUB_ACCESS_TOKEN", "ghp_test".to_string()),
        (
            "DEPLOY_BACKEND_PATH_TST",
            root.join("tst/backend").display().to_string(),
        ),
        (
            "DEPLOY_BACKEND_PATH_PRD",
            root.join("prd/backend").display().to_string(),
        ),
        (
            "DEPLOY_FRONTEND_PATH_TST",
            root.join("tst/frontend").display().to_string(),
        ),
        (
            "DEPLOY_FRONTEND_PATH_PRD",
            root.join("prd/frontend").display().to_string(),
        ),
    ]);
    let config = Arc::new(Config::from_vars(|name| paths.get(name).cloned()).unwrap());

    // Unroutable base URL so no test can accidentally reach the real API
    let github = Arc::new(
        GithubClient::with_base_url(&SecretString::from("ghp_test".to_string()), "http://127.0.0.1:9").unwrap(),
    );

    let supervisor = Arc::new(FakeSupervisor::default());
    let deployer = Arc::new(Deployer::new(config, github, supervisor.clone()));
    let state = Arc::new(ServerState::new(deployer));

    TestEnv {
        router: app(state),
        supervisor,
        backend_tst: root.join("tst/backend"),
        frontend_prd: root.join("prd/frontend"),
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_ok() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let response = env
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_backend_invalid_token_is_401_with_no_side_effects() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/backend",
        json!({
            "environment": "tst",
            "project_url": "https://github.com/org/mono.git",
            "branch": "main",
            "token": "wrong-secret",
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(env.supervisor.restart_count(), 0);
    assert!(!env.backend_tst.exists());
}

#[tokio::test]
async fn test_token_is_checked_before_required_fields() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    // Both the token and the fields are bad; the token check must win
    let request = post_json("/backend", json!({ "token": "wrong-secret" }));
    let response = env.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_backend_missing_fields_is_400() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/backend",
        json!({
            "environment": "tst",
            "project_url": "https://github.com/org/mono.git",
            "token": SECRET,
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backend_invalid_environment_is_400() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/backend",
        json!({
            "environment": "prod",
            "project_url": "https://github.com/org/mono.git",
            "branch": "main",
            "token": SECRET,
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!env.backend_tst.exists());
}

#[tokio::test]
async fn test_backend_blank_branch_is_400() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/backend",
        json!({
            "environment": "tst",
            "project_url": "https://github.com/org/mono.git",
            "branch": "   ",
            "token": SECRET,
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_frontend_invalid_token_is_401() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/frontend",
        json!({
            "environment": "prd",
            "artifact_id": 123,
            "repository": "org/mono",
            "github_token_required": true,
            "token": "wrong-secret",
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!env.frontend_prd.exists());
}

#[tokio::test]
async fn test_frontend_missing_fields_is_400() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/frontend",
        json!({
            "environment": "prd",
            "github_token_required": true,
            "token": SECRET,
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_frontend_flag_must_be_true() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/frontend",
        json!({
            "environment": "prd",
            "artifact_id": 123,
            "repository": "org/mono",
            "github_token_required": false,
            "token": SECRET,
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_frontend_type_mismatched_field_is_400_with_error_body() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    // artifact_id sent as a string instead of a number
    let request = post_json(
        "/frontend",
        json!({
            "environment": "prd",
            "artifact_id": "123",
            "repository": "org/mono",
            "github_token_required": true,
            "token": SECRET,
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_backend_malformed_json_is_400() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = Request::builder()
        .method("POST")
        .uri("/backend")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = env.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_frontend_unreachable_api_is_500_and_destination_untouched() {
    let root = tempfile::tempdir().unwrap();
    let env = test_env(root.path());

    let request = post_json(
        "/frontend",
        json!({
            "environment": "prd",
            "artifact_id": 123,
            "repository": "org/mono",
            "github_token_required": true,
            "token": SECRET,
        }),
    );
    let response = env.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!env.frontend_prd.exists());
    assert_eq!(env.supervisor.restart_count(), 0);
}
