//! Archive extractor

use std::path::Path;

use tokio::process::Command;
use tracing::{info, warn};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

/// Unpack a validated zip bundle into the destination directory,
/// overwriting existing entries.
pub async fn extract_zip(bundle: &Path, destination: &Path) -> Result<(), DeployError> {
    let dest_dir = Dir::new(destination);
    dest_dir.create().await?;

    info!("Extracting {} into {}", bundle.display(), destination.display());

    let bundle_arg = bundle.display().to_string();
    let dest_arg = destination.display().to_string();

    let output = Command::new("unzip")
        .args(["-o", &bundle_arg, "-d", &dest_arg])
        .output()
        .await
        .map_err(|e| DeployError::ExtractionError(format!("Failed to run unzip: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        list_archive_contents(&bundle_arg).await;
        return Err(DeployError::ExtractionError(format!(
            "unzip failed: {}",
            stderr.trim()
        )));
    }

    ensure_extraction_produced_files(&dest_dir).await
}

/// A successful unzip run that yielded nothing still fails the deploy
async fn ensure_extraction_produced_files(destination: &Dir) -> Result<(), DeployError> {
    if destination.entry_count().await? == 0 {
        return Err(DeployError::EmptyExtraction(
            "No files were extracted from the archive".to_string(),
        ));
    }
    Ok(())
}

/// Best-effort archive listing for the failure log. Never fatal.
async fn list_archive_contents(bundle: &str) {
    match Command::new("unzip").args(["-l", bundle]).output().await {
        Ok(output) if output.status.success() => {
            let listing = String::from_utf8_lossy(&output.stdout);
            // Header and footer lines excluded from the approximation
            let entries = listing.lines().count().saturating_sub(4);
            info!("Archive appears to contain about {} entries", entries);
        }
        _ => warn!("Could not list archive contents for diagnostics"),
    }
}
