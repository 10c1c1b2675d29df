//! Error types for the deploy webhook server

use thiserror::Error;

/// Main error type for the deploy webhook server
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream API error: {0}")]
    UpstreamError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Downloaded artifact is empty: {0}")]
    EmptyArtifact(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Extraction produced no files: {0}")]
    EmptyExtraction(String),

    #[error("Branch mismatch: {0}")]
    BranchMismatch(String),

    #[error("Missing backend folder: {0}")]
    MissingBackendFolder(String),

    #[error("Swap error: {0}")]
    SwapError(String),

    #[error("Install error: {0}")]
    InstallError(String),

    #[error("Supervisor connect error: {0}")]
    ConnectError(String),

    #[error("Process restart error: {0}")]
    RestartError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::ServerError(err.to_string())
    }
}
