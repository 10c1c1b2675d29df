//! Deployment orchestration
//!
//! The backend and frontend orchestrators compose the supporting steps
//! (secret check, fetch/clone, extract, swap, install, restart) and classify
//! every failure for the HTTP boundary.

pub mod archive;
pub mod artifact;
pub mod backend;
pub mod fsm;
pub mod frontend;
pub mod git;
pub mod install;
pub mod locks;
pub mod supervisor;
pub mod swap;

use std::fmt;
use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::Config;
use crate::errors::DeployError;
use crate::github::client::GithubClient;
use locks::DeployLocks;
use supervisor::ProcessSupervisor;

/// Compare the caller-supplied token against the configured deploy secret.
///
/// Strict equality; checked before any other field is inspected.
pub fn validate_token(supplied: Option<&str>, config: &Config) -> bool {
    supplied == Some(config.deploy_secret.expose_secret())
}

/// Classified deploy failure, mapped to an HTTP status by the handlers
#[derive(Debug)]
pub enum DeployFailure {
    /// Bad deploy secret (401)
    Unauthorized(String),

    /// Missing or malformed request fields (400)
    BadRequest(String),

    /// Any downstream failure (500)
    Internal(DeployError),
}

impl fmt::Display for DeployFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployFailure::Unauthorized(msg) => write!(f, "{}", msg),
            DeployFailure::BadRequest(msg) => write!(f, "{}", msg),
            DeployFailure::Internal(err) => write!(f, "{}", err),
        }
    }
}

impl From<DeployError> for DeployFailure {
    fn from(err: DeployError) -> Self {
        DeployFailure::Internal(err)
    }
}

/// Shared deployment services behind both orchestrators
pub struct Deployer {
    pub(crate) config: Arc<Config>,
    pub(crate) github: Arc<GithubClient>,
    pub(crate) supervisor: Arc<dyn ProcessSupervisor>,
    pub(crate) locks: DeployLocks,
}

impl Deployer {
    pub fn new(
        config: Arc<Config>,
        github: Arc<GithubClient>,
        supervisor: Arc<dyn ProcessSupervisor>,
    ) -> Self {
        Self {
            config,
            github,
            supervisor,
            locks: DeployLocks::new(),
        }
    }
}
