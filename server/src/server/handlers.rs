//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::deploy::backend::BackendDeployRequest;
use crate::deploy::frontend::FrontendDeployRequest;
use crate::deploy::DeployFailure;
use crate::server::state::ServerState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: "webhook-deploy-server".to_string(),
    })
}

/// JSON extractor that reports malformed or type-mismatched bodies with the
/// same 400 `{ "error": ... }` shape the validation failures use, instead of
/// axum's default 422 rejection.
pub struct DeployJson<T>(pub T);

impl<S, T> FromRequest<S> for DeployJson<T>
where
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response()),
        }
    }
}

fn failure_response(failure: DeployFailure) -> Response {
    match failure {
        DeployFailure::Unauthorized(message) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": message })),
        )
            .into_response(),
        DeployFailure::BadRequest(message) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": message })),
        )
            .into_response(),
        DeployFailure::Internal(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Internal server error",
                "details": err.to_string(),
            })),
        )
            .into_response(),
    }
}

/// Backend deploy handler
pub async fn backend_handler(
    State(state): State<Arc<ServerState>>,
    DeployJson(request): DeployJson<BackendDeployRequest>,
) -> Response {
    match state.deployer.deploy_backend(request).await {
        Ok(done) => Json(json!({
            "success": true,
            "message": format!("Backend deployed successfully to {} environment", done.environment),
            "branch": done.branch,
            "environment": done.environment,
        }))
        .into_response(),
        Err(failure) => failure_response(failure),
    }
}

/// Frontend deploy handler
pub async fn frontend_handler(
    State(state): State<Arc<ServerState>>,
    DeployJson(request): DeployJson<FrontendDeployRequest>,
) -> Response {
    match state.deployer.deploy_frontend(request).await {
        Ok(done) => Json(json!({
            "success": true,
            "message": format!("Frontend deployed successfully to {} environment", done.environment),
            "path": done.path,
            "artifact_name": done.artifact_name,
            "artifact_id": done.artifact_id,
            "repository": done.repository,
            "run_id": done.run_id,
        }))
        .into_response(),
        Err(failure) => failure_response(failure),
    }
}
