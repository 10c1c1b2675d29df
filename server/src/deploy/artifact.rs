//! Artifact fetcher
//!
//! Resolves an Actions artifact through the hosting API and downloads the
//! zip bundle into a scoped temp directory.

use tracing::{info, warn};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::github::client::GithubClient;

const BUNDLE_FILE_NAME: &str = "artifact.zip";

/// A downloaded artifact bundle inside its scoped temp directory.
///
/// The enclosing deploy owns the temp directory and removes it on every
/// exit path, including extraction failures.
#[derive(Debug)]
pub struct DownloadedBundle {
    temp_dir: Dir,
    bundle: File,
    pub artifact_name: String,
}

impl DownloadedBundle {
    /// Path of the zip bundle on disk
    pub fn bundle(&self) -> &File {
        &self.bundle
    }

    /// Remove the bundle and its temp directory. Called on every exit path.
    pub async fn cleanup(&self) {
        if let Err(e) = self.temp_dir.delete().await {
            warn!("Failed to clean up artifact temp directory {}: {}", self.temp_dir.path().display(), e);
        }
    }
}

/// Require the zip magic signature at the start of the bundle.
///
/// Guards against the hosting API silently answering with an HTML error
/// page instead of binary content.
pub fn validate_zip_signature(bytes: &[u8]) -> Result<(), DeployError> {
    if bytes.len() < 2 || &bytes[..2] != b"PK" {
        let prefix: String = bytes
            .iter()
            .take(4)
            .map(|b| format!("{:02x}", b))
            .collect();
        return Err(DeployError::InvalidArchive(format!(
            "Downloaded file is not a valid zip archive (signature: {})",
            prefix
        )));
    }
    Ok(())
}

/// Resolve and download an artifact bundle.
///
/// On any failure the temp directory is removed before the error is
/// returned, so no partial file stays referenced.
pub async fn fetch_artifact(
    github: &GithubClient,
    repository: &str,
    artifact_id: u64,
) -> Result<DownloadedBundle, DeployError> {
    let info = github.artifact_metadata(repository, artifact_id).await?;
    info!(
        "Artifact found: {} (ID: {}, {} bytes)",
        info.name, info.id, info.size_in_bytes
    );

    let download_url = github.artifact_download_url(repository, artifact_id).await?;
    info!("Downloading artifact from temporary URL");
    let bytes = github.download(&download_url).await?;

    let temp_dir = Dir::create_temp_dir("artifact").await?;
    let bundle = temp_dir.file(BUNDLE_FILE_NAME);

    let result = persist_bundle(&bundle, &bytes).await;
    if let Err(e) = result {
        if let Err(cleanup) = temp_dir.delete().await {
            warn!("Failed to clean up artifact temp directory: {}", cleanup);
        }
        return Err(e);
    }

    info!("Artifact downloaded: {} bytes at {}", bytes.len(), bundle.path().display());
    Ok(DownloadedBundle {
        temp_dir,
        bundle,
        artifact_name: info.name,
    })
}

async fn persist_bundle(bundle: &File, bytes: &[u8]) -> Result<(), DeployError> {
    if bytes.is_empty() {
        return Err(DeployError::EmptyArtifact(
            "The downloaded artifact contains no bytes".to_string(),
        ));
    }

    bundle.write_bytes(bytes).await?;
    validate_zip_signature(bytes)
}
