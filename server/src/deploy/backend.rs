//! Backend deploy orchestrator
//!
//! Clones the requested branch of the monorepo, verifies its shape, swaps
//! the `backend` subtree into the destination, installs dependencies and
//! restarts the PM2 process for the environment.

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::Environment;
use crate::deploy::fsm::{BackendPhase, PhaseTracker};
use crate::deploy::git::Checkout;
use crate::deploy::supervisor::backend_process_name;
use crate::deploy::swap::{append_deployment_record, swap_into_place, DeploymentRecord};
use crate::deploy::{install, validate_token, DeployFailure, Deployer};
use crate::errors::DeployError;

/// Raw request body for `POST /backend`.
///
/// Fields are optional at the serde layer so the orchestrator controls
/// validation order: token first, then presence, then shape.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendDeployRequest {
    pub environment: Option<String>,
    pub project_url: Option<String>,
    pub branch: Option<String>,
    pub token: Option<String>,
}

/// Successful backend deploy
#[derive(Debug, Clone)]
pub struct BackendDeployed {
    pub environment: Environment,
    pub branch: String,
}

impl Deployer {
    /// Run a backend deploy end to end
    pub async fn deploy_backend(
        &self,
        request: BackendDeployRequest,
    ) -> Result<BackendDeployed, DeployFailure> {
        let mut phase = PhaseTracker::new(BackendPhase::Received);

        // Secret before anything else
        if !validate_token(request.token.as_deref(), &self.config) {
            return Err(DeployFailure::Unauthorized(
                "Invalid authorization token".to_string(),
            ));
        }
        phase.enter(BackendPhase::SecretChecked);

        // Required fields, then value shape
        let (environment_raw, project_url, branch_raw) = match (
            request.environment.as_deref(),
            request.project_url.as_deref(),
            request.branch.as_deref(),
        ) {
            (Some(env), Some(url), Some(branch)) => (env, url.to_string(), branch),
            _ => {
                return Err(DeployFailure::BadRequest(
                    "Parameters environment, project_url and branch are required".to_string(),
                ))
            }
        };

        let environment: Environment = environment_raw
            .parse()
            .map_err(DeployFailure::BadRequest)?;

        let branch = branch_raw.trim().to_string();
        if branch.is_empty() {
            return Err(DeployFailure::BadRequest(
                "The branch parameter must be a non-empty string".to_string(),
            ));
        }
        phase.enter(BackendPhase::FieldsValidated);

        let destination = self.config.paths.backend(environment).clone();
        phase.enter(BackendPhase::EnvironmentResolved);

        info!(
            "Starting backend deploy: environment={} branch={} destination={}",
            environment,
            branch,
            destination.display()
        );

        // Serialize deploys to the same destination
        let _guard = self.locks.acquire(&destination).await;

        let checkout = Checkout::clone_branch(&project_url, &branch, &self.config.github_token)
            .await
            .map_err(DeployFailure::from)?;
        phase.enter(BackendPhase::Cloned);

        // The temp clone is removed on every exit path from here on
        let result = self
            .backend_steps(&mut phase, &checkout, environment, &project_url, &branch, &destination)
            .await;
        checkout.cleanup().await;

        match result {
            Ok(()) => {
                phase.enter(BackendPhase::Done);
                info!("Backend deployed successfully to {} environment", environment);
                Ok(BackendDeployed { environment, branch })
            }
            Err(e) => {
                error!(
                    deploy_id = %phase.deploy_id(),
                    phase = ?phase.current(),
                    "Backend deploy failed: {}", e
                );
                Err(DeployFailure::Internal(e))
            }
        }
    }

    async fn backend_steps(
        &self,
        phase: &mut PhaseTracker<BackendPhase>,
        checkout: &Checkout,
        environment: Environment,
        project_url: &str,
        branch: &str,
        destination: &std::path::Path,
    ) -> Result<(), DeployError> {
        checkout.verify_branch(branch)?;
        phase.enter(BackendPhase::BranchVerified);

        let commit = checkout.commit_info().await?;
        info!(
            "Deploying commit {} ({}) by {} on {}",
            commit.hash, commit.subject, commit.author, commit.date
        );

        let backend_dir = checkout.backend_dir().await?;
        phase.enter(BackendPhase::BackendFolderVerified);

        swap_into_place(backend_dir.path(), destination).await?;
        phase.enter(BackendPhase::Swapped);
        phase.enter(BackendPhase::EnvRestored);

        let record = DeploymentRecord {
            timestamp: Utc::now(),
            environment,
            branch: checkout.actual_branch().to_string(),
            commit: commit.hash.clone(),
            commit_message: commit.subject.clone(),
            project_url: project_url.to_string(),
        };
        if let Err(e) = append_deployment_record(destination, &record).await {
            warn!("Failed to write deployment log: {}", e);
        }

        install::clean_install(destination).await?;
        phase.enter(BackendPhase::DependenciesInstalled);

        self.supervisor
            .restart(backend_process_name(environment))
            .await?;
        phase.enter(BackendPhase::ProcessRestarted);

        Ok(())
    }
}
