//! Process supervisor interface

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use crate::config::Environment;
use crate::errors::DeployError;

/// Restarts named long-running processes.
///
/// Injected into the orchestrators so tests can substitute a fake.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Restart a process by name
    async fn restart(&self, process_name: &str) -> Result<(), DeployError>;
}

/// Backend process name for an environment
pub fn backend_process_name(environment: Environment) -> &'static str {
    match environment {
        Environment::Tst => "tst_backend",
        Environment::Prd => "prd_backend",
    }
}

/// PM2-backed supervisor, shelling out to the `pm2` CLI
pub struct Pm2Supervisor;

#[async_trait]
impl ProcessSupervisor for Pm2Supervisor {
    async fn restart(&self, process_name: &str) -> Result<(), DeployError> {
        // Connectivity check first so connect and restart failures stay distinct
        let ping = Command::new("pm2")
            .arg("ping")
            .output()
            .await
            .map_err(|e| DeployError::ConnectError(format!("Failed to run pm2: {}", e)))?;

        if !ping.status.success() {
            let stderr = String::from_utf8_lossy(&ping.stderr);
            error!("PM2 daemon unreachable: {}", stderr.trim());
            return Err(DeployError::ConnectError(format!(
                "PM2 daemon unreachable: {}",
                stderr.trim()
            )));
        }

        let restart = Command::new("pm2")
            .args(["restart", process_name])
            .output()
            .await
            .map_err(|e| DeployError::ConnectError(format!("Failed to run pm2: {}", e)))?;

        if !restart.status.success() {
            let stderr = String::from_utf8_lossy(&restart.stderr);
            error!("Failed to restart process {}: {}", process_name, stderr.trim());
            return Err(DeployError::RestartError(format!(
                "Failed to restart process {}: {}",
                process_name,
                stderr.trim()
            )));
        }

        info!("Process {} restarted successfully", process_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_process_names() {
        assert_eq!(backend_process_name(Environment::Tst), "tst_backend");
        assert_eq!(backend_process_name(Environment::Prd), "prd_backend");
    }
}
