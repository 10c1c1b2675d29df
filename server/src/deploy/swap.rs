//! Deployment swapper
//!
//! Replaces a destination directory's contents with a newly materialized
//! tree. The new tree is staged beside the destination and renamed into
//! place, so a failed copy never leaves the destination empty. An existing
//! `.env` at the destination survives the swap byte for byte; a
//! source-provided `.env` never does.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::config::Environment;
use crate::errors::DeployError;
use crate::filesys::dir::{copy_dir, Dir};
use crate::filesys::file::File;

const ENV_FILE_NAME: &str = ".env";
const DEPLOY_LOG_NAME: &str = "deployment.log";

/// Record of a successful backend deploy, appended to the destination's
/// append-only deployment log.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentRecord {
    pub timestamp: DateTime<Utc>,
    pub environment: Environment,
    pub branch: String,
    pub commit: String,
    pub commit_message: String,
    pub project_url: String,
}

impl DeploymentRecord {
    /// Human-readable log entry, one block per deploy
    pub fn to_log_entry(&self) -> String {
        format!(
            "{} - Deploy successful\n\
             Environment: {}\n\
             Branch: {}\n\
             Commit: {}\n\
             Message: {}\n\
             URL: {}\n\
             ---\n",
            self.timestamp.to_rfc3339(),
            self.environment,
            self.branch,
            self.commit,
            self.commit_message,
            self.project_url
        )
    }
}

/// Append a deployment record to the destination's log file.
///
/// The log is append-only and never rotated. Callers treat a write failure
/// as non-fatal.
pub async fn append_deployment_record(
    destination: &Path,
    record: &DeploymentRecord,
) -> Result<(), DeployError> {
    let log = File::new(destination.join(DEPLOY_LOG_NAME));
    log.append_string(&record.to_log_entry()).await?;
    info!("Deployment log updated: {}", log.path().display());
    Ok(())
}

fn swap_io(context: &str, err: DeployError) -> DeployError {
    DeployError::SwapError(format!("{}: {}", context, err))
}

/// Replace the destination directory's contents with the source tree.
///
/// Sequence: capture `.env` backup, copy the source into a staging
/// directory beside the destination, restore the backup into the stage,
/// rename the old destination aside, rename the stage into place, then
/// drop the old tree. If the final rename fails the old tree is put back.
pub async fn swap_into_place(source: &Path, destination: &Path) -> Result<(), DeployError> {
    let parent = destination.parent().ok_or_else(|| {
        DeployError::SwapError(format!(
            "Destination {} has no parent directory",
            destination.display()
        ))
    })?;
    fs::create_dir_all(parent)
        .await
        .map_err(|e| DeployError::SwapError(format!("Failed to create destination parent: {}", e)))?;

    // Capture the existing environment file before anything moves
    let env_file = File::new(destination.join(ENV_FILE_NAME));
    let env_backup = if env_file.exists().await {
        let contents = env_file
            .read_bytes()
            .await
            .map_err(|e| swap_io("Failed to back up .env", e))?;
        info!(".env file backed up ({} bytes)", contents.len());
        Some(contents)
    } else {
        info!("No .env file found to back up");
        None
    };

    let dest_name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("deploy");
    let token = Utc::now().timestamp_millis();
    let stage = parent.join(format!(".{}-stage-{}", dest_name, token));
    let old = parent.join(format!(".{}-old-{}", dest_name, token));

    // Stage the new tree next to the destination
    if let Err(e) = copy_dir(source, &stage).await {
        if let Err(cleanup) = Dir::new(&stage).delete().await {
            warn!("Failed to remove staging directory: {}", cleanup);
        }
        return Err(swap_io("Failed to stage new tree", e));
    }

    // The backed-up .env wins over anything the source shipped
    if let Some(contents) = &env_backup {
        let staged_env = File::new(stage.join(ENV_FILE_NAME));
        if let Err(e) = staged_env.write_bytes(contents).await {
            if let Err(cleanup) = Dir::new(&stage).delete().await {
                warn!("Failed to remove staging directory: {}", cleanup);
            }
            return Err(swap_io("Failed to restore .env into staged tree", e));
        }
        info!(".env file restored");
    }

    // Move the old tree aside, then the stage into place
    let had_previous = fs::metadata(destination).await.is_ok();
    if had_previous {
        if let Err(e) = fs::rename(destination, &old).await {
            if let Err(cleanup) = Dir::new(&stage).delete().await {
                warn!("Failed to remove staging directory: {}", cleanup);
            }
            return Err(DeployError::SwapError(format!(
                "Failed to move previous deployment aside: {}",
                e
            )));
        }
    }

    if let Err(e) = fs::rename(&stage, destination).await {
        if had_previous {
            if let Err(restore) = fs::rename(&old, destination).await {
                warn!("Failed to restore previous deployment: {}", restore);
            }
        }
        if let Err(cleanup) = Dir::new(&stage).delete().await {
            warn!("Failed to remove staging directory: {}", cleanup);
        }
        return Err(DeployError::SwapError(format!(
            "Failed to move staged tree into place: {}",
            e
        )));
    }

    if had_previous {
        if let Err(e) = Dir::new(&old).delete().await {
            warn!("Failed to remove previous deployment tree {}: {}", old.display(), e);
        }
    }

    info!("Deployed new tree to {}", destination.display());
    Ok(())
}
