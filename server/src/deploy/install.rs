//! Dependency installer

use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::errors::DeployError;

/// Run a deterministic, lockfile-based install inside the deployed tree.
///
/// The working directory is passed explicitly; process-wide state is never
/// mutated. Failure is fatal to the deploy and there is no retry.
pub async fn clean_install(dir: &Path) -> Result<(), DeployError> {
    info!("Installing dependencies in {}", dir.display());

    let output = Command::new("npm")
        .arg("ci")
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| DeployError::InstallError(format!("Failed to run npm: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeployError::InstallError(format!(
            "npm ci failed: {}",
            stderr.trim()
        )));
    }

    info!("Dependencies installed");
    Ok(())
}
