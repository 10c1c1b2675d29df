//! GitHub API client

use reqwest::{header, redirect, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};

use crate::errors::DeployError;

const API_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("deploy-webhook/", env!("CARGO_PKG_VERSION"));

/// Metadata for an Actions artifact
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactInfo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub expired: bool,
}

/// Authenticated user info, used by the token diagnostic
#[derive(Debug, Clone)]
pub struct TokenIntrospection {
    pub login: String,
    pub email: Option<String>,
    pub scopes: Option<String>,
    pub accepted_scopes: Option<String>,
}

/// HTTP client for the GitHub REST API
pub struct GithubClient {
    client: Client,
    /// Separate client for the artifact zip endpoint, which answers with a
    /// redirect to a pre-signed URL that must not receive the credential.
    no_redirect: Client,
    base_url: String,
    token: SecretString,
}

impl GithubClient {
    /// Create a new GitHub API client
    pub fn new(token: &SecretString) -> Result<Self, DeployError> {
        Self::with_base_url(token, API_BASE_URL)
    }

    /// Create a client against a custom API base URL (used by tests)
    pub fn with_base_url(token: &SecretString, base_url: &str) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        let no_redirect = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: SecretString::from(token.expose_secret().to_owned()),
        })
    }

    fn auth_value(&self) -> String {
        format!("token {}", self.token.expose_secret())
    }

    /// Fetch metadata for an Actions artifact
    pub async fn artifact_metadata(
        &self,
        repository: &str,
        artifact_id: u64,
    ) -> Result<ArtifactInfo, DeployError> {
        let url = format!(
            "{}/repos/{}/actions/artifacts/{}",
            self.base_url, repository, artifact_id
        );
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_value())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let info = response.json().await?;
                Ok(info)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DeployError::AuthError(format!(
                "GitHub API rejected the access token ({}). Check that GITHUB_ACCESS_TOKEN can read artifacts",
                response.status()
            ))),
            StatusCode::NOT_FOUND => Err(DeployError::NotFound(format!(
                "Artifact {} not found in {}. Check that the artifact_id is correct and the artifact has not expired",
                artifact_id, repository
            ))),
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("GitHub API error: {} - {}", status, body);
                Err(DeployError::UpstreamError(format!("GitHub API returned {}", status)))
            }
        }
    }

    /// Resolve the temporary pre-signed download URL for an artifact zip.
    ///
    /// GitHub answers this endpoint with a redirect whose `Location` header
    /// carries the pre-signed URL, so redirect following is disabled here.
    pub async fn artifact_download_url(
        &self,
        repository: &str,
        artifact_id: u64,
    ) -> Result<String, DeployError> {
        let url = format!(
            "{}/repos/{}/actions/artifacts/{}/zip",
            self.base_url, repository, artifact_id
        );
        debug!("GET {} (no redirect)", url);

        let response = self
            .no_redirect
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_value())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DeployError::AuthError(format!(
                "GitHub API rejected the access token while downloading the artifact ({})",
                status
            )));
        }
        if !status.is_success() && !status.is_redirection() {
            return Err(DeployError::DownloadError(format!(
                "Artifact download request failed: {}",
                status
            )));
        }

        match response.headers().get(header::LOCATION) {
            Some(location) => {
                let location = location
                    .to_str()
                    .map_err(|_| DeployError::DownloadError("Malformed Location header in artifact redirect".to_string()))?;
                Ok(location.to_string())
            }
            None => Err(DeployError::DownloadError(
                "GitHub did not provide a temporary download URL for the artifact".to_string(),
            )),
        }
    }

    /// Download bytes from a pre-signed URL. No credential is attached.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, DeployError> {
        debug!("GET {} (pre-signed)", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DeployError::DownloadError(format!(
                "Download from temporary URL failed: {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Introspect the configured token via `GET /user`
    pub async fn introspect_token(&self) -> Result<TokenIntrospection, DeployError> {
        let url = format!("{}/user", self.base_url);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_value())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeployError::AuthError(format!(
                "Token introspection failed: {}",
                response.status()
            )));
        }

        let header_string = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let scopes = header_string("x-oauth-scopes");
        let accepted_scopes = header_string("x-accepted-oauth-scopes");

        #[derive(Deserialize)]
        struct UserInfo {
            login: String,
            email: Option<String>,
        }

        let user: UserInfo = response.json().await?;
        Ok(TokenIntrospection {
            login: user.login,
            email: user.email,
            scopes,
            accepted_scopes,
        })
    }

    /// Probe an API path with the configured token, returning the HTTP status.
    ///
    /// Used by the permission diagnostic to report which repository endpoints
    /// the token can reach.
    pub async fn probe(&self, path: &str) -> Result<StatusCode, DeployError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} (probe)", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_value())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        Ok(response.status())
    }
}
