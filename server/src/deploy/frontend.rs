//! Frontend deploy orchestrator
//!
//! Downloads a prebuilt artifact bundle from the hosting API, extracts it
//! into a scoped temp directory and swaps it into the destination. No
//! dependency install and no process restart: the artifact is prebuilt and
//! served statically.

use serde::Deserialize;
use tracing::{error, info};

use crate::config::Environment;
use crate::deploy::artifact::fetch_artifact;
use crate::deploy::fsm::{FrontendPhase, PhaseTracker};
use crate::deploy::swap::swap_into_place;
use crate::deploy::{archive, validate_token, DeployFailure, Deployer};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;

/// Raw request body for `POST /frontend`
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendDeployRequest {
    pub environment: Option<String>,
    pub artifact_name: Option<String>,
    pub artifact_id: Option<u64>,
    pub repository: Option<String>,
    pub run_id: Option<u64>,
    pub github_token_required: Option<bool>,
    pub token: Option<String>,
}

/// Successful frontend deploy
#[derive(Debug, Clone)]
pub struct FrontendDeployed {
    pub environment: Environment,
    pub path: String,
    pub artifact_name: String,
    pub artifact_id: u64,
    pub repository: String,
    pub run_id: Option<u64>,
}

impl Deployer {
    /// Run a frontend deploy end to end
    pub async fn deploy_frontend(
        &self,
        request: FrontendDeployRequest,
    ) -> Result<FrontendDeployed, DeployFailure> {
        let mut phase = PhaseTracker::new(FrontendPhase::Received);

        // Secret before anything else
        if !validate_token(request.token.as_deref(), &self.config) {
            return Err(DeployFailure::Unauthorized(
                "Invalid authorization token".to_string(),
            ));
        }
        phase.enter(FrontendPhase::SecretChecked);

        let (environment_raw, artifact_id, repository) = match (
            request.environment.as_deref(),
            request.artifact_id,
            request.repository.as_deref(),
        ) {
            (Some(env), Some(id), Some(repo)) => (env, id, repo.to_string()),
            _ => {
                return Err(DeployFailure::BadRequest(
                    "Parameters environment, artifact_id and repository are required".to_string(),
                ))
            }
        };

        let environment: Environment = environment_raw
            .parse()
            .map_err(DeployFailure::BadRequest)?;
        phase.enter(FrontendPhase::FieldsValidated);

        // This route only serves token-authenticated artifact deploys
        if request.github_token_required != Some(true) {
            return Err(DeployFailure::BadRequest(
                "github_token_required must be true for this deploy type".to_string(),
            ));
        }
        phase.enter(FrontendPhase::FlagChecked);

        let destination = self.config.paths.frontend(environment).clone();
        phase.enter(FrontendPhase::EnvironmentResolved);

        info!(
            "Starting frontend deploy: environment={} artifact_id={} repository={} run_id={:?}",
            environment, artifact_id, repository, request.run_id
        );

        // Serialize deploys to the same destination
        let _guard = self.locks.acquire(&destination).await;

        let bundle = fetch_artifact(&self.github, &repository, artifact_id)
            .await
            .map_err(DeployFailure::from)?;
        phase.enter(FrontendPhase::Fetched);

        // Bundle temp dir and extraction dir are removed on every exit path
        let result = self.frontend_steps(&mut phase, &bundle, &destination).await;
        bundle.cleanup().await;

        match result {
            Ok(()) => {
                phase.enter(FrontendPhase::Done);
                info!("Frontend deployed successfully to {} environment", environment);
                Ok(FrontendDeployed {
                    environment,
                    path: destination.display().to_string(),
                    artifact_name: request.artifact_name.unwrap_or(bundle.artifact_name.clone()),
                    artifact_id,
                    repository,
                    run_id: request.run_id,
                })
            }
            Err(e) => {
                error!(
                    deploy_id = %phase.deploy_id(),
                    phase = ?phase.current(),
                    "Frontend deploy failed: {}", e
                );
                Err(DeployFailure::Internal(e))
            }
        }
    }

    async fn frontend_steps(
        &self,
        phase: &mut PhaseTracker<FrontendPhase>,
        bundle: &crate::deploy::artifact::DownloadedBundle,
        destination: &std::path::Path,
    ) -> Result<(), DeployError> {
        let extract_dir = Dir::create_temp_dir("extract").await?;

        let result = async {
            archive::extract_zip(bundle.bundle().path(), extract_dir.path()).await?;
            phase.enter(FrontendPhase::Extracted);

            swap_into_place(extract_dir.path(), destination).await?;
            phase.enter(FrontendPhase::Swapped);
            Ok(())
        }
        .await;

        if let Err(e) = extract_dir.delete().await {
            tracing::warn!("Failed to clean up extraction directory: {}", e);
        }

        result
    }
}
