//! Repository materializer
//!
//! Clones a single branch of the monorepo into a scoped temp directory and
//! exposes the checks and metadata the backend deploy needs.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

const HOSTING_DOMAIN: &str = "https://github.com/";

/// Last-commit metadata for the deployment record
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub subject: String,
    pub author: String,
    pub date: String,
}

/// A temporary single-branch clone of the monorepo.
///
/// The enclosing deploy owns the directory and removes it on every exit path.
#[derive(Debug)]
pub struct Checkout {
    dir: Dir,
    actual_branch: String,
}

/// Embed the access token into the clone URL when the repository lives on
/// the known hosting domain, so private repositories clone without prompts.
pub fn authenticated_clone_url(project_url: &str, token: &SecretString) -> String {
    if !token.expose_secret().is_empty() && project_url.starts_with(HOSTING_DOMAIN) {
        project_url.replacen(
            HOSTING_DOMAIN,
            &format!("https://{}@github.com/", token.expose_secret()),
            1,
        )
    } else {
        project_url.to_string()
    }
}

/// Strip the access token out of a surfaced error message. git echoes the
/// remote URL in its stderr, and with an authenticated clone URL that would
/// leak the token into logs and error responses.
fn redact_credential(err: DeployError, token: &SecretString) -> DeployError {
    let secret = token.expose_secret();
    if secret.is_empty() {
        return err;
    }
    match err {
        DeployError::UpstreamError(message) => {
            DeployError::UpstreamError(message.replace(secret, "***"))
        }
        other => other,
    }
}

/// Parse the `git log -1` record produced with unit-separator formatting
pub fn parse_commit_record(record: &str) -> Result<CommitInfo, DeployError> {
    let mut fields = record.trim().split('\x1f');
    let mut next = || {
        fields
            .next()
            .map(|f| f.trim().to_string())
            .ok_or_else(|| DeployError::UpstreamError("Malformed git log output".to_string()))
    };

    Ok(CommitInfo {
        hash: next()?,
        subject: next()?,
        author: next()?,
        date: next()?,
    })
}

async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<String, DeployError> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = command
        .output()
        .await
        .map_err(|e| DeployError::UpstreamError(format!("Failed to run git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeployError::UpstreamError(format!(
            "git {} failed: {}",
            args.first().unwrap_or(&""),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

impl Checkout {
    /// Clone a single branch of the repository into a fresh temp directory.
    ///
    /// The branch must be non-empty; this is re-checked here so the
    /// materializer never reaches the network with a blank ref.
    pub async fn clone_branch(
        project_url: &str,
        branch: &str,
        token: &SecretString,
    ) -> Result<Self, DeployError> {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(DeployError::ValidationError(
                "Branch must be specified and non-empty".to_string(),
            ));
        }

        let temp_dir = Dir::create_temp_dir("deploy").await?;
        info!("Cloning branch {} into {}", branch, temp_dir.path().display());

        let clone_url = authenticated_clone_url(project_url, token);
        let target = temp_dir.path().display().to_string();

        let result = run_git(
            &["clone", "--branch", branch, "--single-branch", &clone_url, &target],
            None,
        )
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = temp_dir.delete().await {
                warn!("Failed to clean up temp clone directory: {}", cleanup);
            }
            return Err(redact_credential(e, token));
        }

        // Read back the branch that actually got checked out
        let readback = run_git(&["rev-parse", "--abbrev-ref", "HEAD"], Some(temp_dir.path())).await;
        let actual_branch = match readback {
            Ok(out) => out.trim().to_string(),
            Err(e) => {
                if let Err(cleanup) = temp_dir.delete().await {
                    warn!("Failed to clean up temp clone directory: {}", cleanup);
                }
                return Err(e);
            }
        };

        debug!("Checked-out branch: {}", actual_branch);
        Ok(Self {
            dir: temp_dir,
            actual_branch,
        })
    }

    /// The branch the clone actually checked out
    pub fn actual_branch(&self) -> &str {
        &self.actual_branch
    }

    /// The clone directory
    pub fn dir(&self) -> &Dir {
        &self.dir
    }

    /// Reject the checkout unless the checked-out branch matches the request.
    ///
    /// Guards against git silently falling back to a default branch when the
    /// requested one does not exist upstream.
    pub fn verify_branch(&self, requested: &str) -> Result<(), DeployError> {
        if self.actual_branch != requested {
            return Err(DeployError::BranchMismatch(format!(
                "Expected branch '{}' but the clone checked out '{}'",
                requested, self.actual_branch
            )));
        }
        Ok(())
    }

    /// Last-commit metadata of the checked-out branch
    pub async fn commit_info(&self) -> Result<CommitInfo, DeployError> {
        let record = run_git(
            &["log", "-1", "--pretty=format:%H%x1f%s%x1f%an%x1f%ad", "--date=short"],
            Some(self.dir.path()),
        )
        .await?;
        parse_commit_record(&record)
    }

    /// The `backend` subtree the monorepo is expected to contain
    pub async fn backend_dir(&self) -> Result<Dir, DeployError> {
        let backend = self.dir.subdir("backend");
        if !backend.exists().await {
            return Err(DeployError::MissingBackendFolder(
                "The cloned monorepo does not contain a 'backend' folder".to_string(),
            ));
        }
        Ok(backend)
    }

    /// Remove the temp clone directory. Called on every exit path.
    pub async fn cleanup(&self) {
        if let Err(e) = self.dir.delete().await {
            warn!("Failed to clean up temp clone directory {}: {}", self.dir.path().display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_clone_url_embeds_token_for_github() {
        let url = authenticated_clone_url("https://github.com/org/mono.git", &secret("tok123"));
        assert_eq!(url, "https://tok123@github.com/org/mono.git");
    }

    #[test]
    fn test_clone_url_untouched_for_other_hosts() {
        let url = authenticated_clone_url("https://gitlab.com/org/mono.git", &secret("tok123"));
        assert_eq!(url, "https://gitlab.com/org/mono.git");
    }

    #[test]
    fn test_clone_url_untouched_without_token() {
        let url = authenticated_clone_url("https://github.com/org/mono.git", &secret(""));
        assert_eq!(url, "https://github.com/org/mono.git");
    }

    #[test]
    fn test_parse_commit_record() {
        let record = "abc123\x1fFix the build\x1fAda Lovelace\x1f2026-08-25";
        let info = parse_commit_record(record).unwrap();
        assert_eq!(info.hash, "abc123");
        assert_eq!(info.subject, "Fix the build");
        assert_eq!(info.author, "Ada Lovelace");
        assert_eq!(info.date, "2026-08-25");
    }

    #[test]
    fn test_parse_commit_record_rejects_short_output() {
        assert!(parse_commit_record("abc123\x1fonly-two").is_err());
    }

    #[tokio::test]
    async fn test_clone_rejects_blank_branch() {
        let err = Checkout::clone_branch("https://github.com/org/mono.git", "   ", &secret("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::ValidationError(_)));
    }

    #[test]
    fn test_verify_branch_rejects_mismatch() {
        let checkout = Checkout {
            dir: Dir::new("/tmp/unused"),
            actual_branch: "main".to_string(),
        };
        assert!(checkout.verify_branch("main").is_ok());

        let err = checkout.verify_branch("release").unwrap_err();
        assert!(matches!(err, DeployError::BranchMismatch(_)));
    }

    #[tokio::test]
    async fn test_backend_dir_requires_backend_folder() {
        let root = tempfile::tempdir().unwrap();
        let checkout = Checkout {
            dir: Dir::new(root.path()),
            actual_branch: "main".to_string(),
        };

        let err = checkout.backend_dir().await.unwrap_err();
        assert!(matches!(err, DeployError::MissingBackendFolder(_)));

        tokio::fs::create_dir(root.path().join("backend")).await.unwrap();
        assert!(checkout.backend_dir().await.is_ok());
    }

    #[test]
    fn test_git_error_message_redacts_token() {
        let err = DeployError::UpstreamError(
            "git clone failed: fatal: unable to access 'https://tok123@github.com/org/mono.git/'"
                .to_string(),
        );
        let redacted = redact_credential(err, &secret("tok123"));
        let message = redacted.to_string();
        assert!(!message.contains("tok123"));
        assert!(message.contains("***@github.com"));
    }
}
