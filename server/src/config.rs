//! Server configuration from environment variables

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Tst,
    Prd,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Tst => "tst",
            Environment::Prd => "prd",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tst" => Ok(Environment::Tst),
            "prd" => Ok(Environment::Prd),
            other => Err(format!("Environment must be \"tst\" or \"prd\", got \"{}\"", other)),
        }
    }
}

/// Deployment destination paths, one per environment and kind
#[derive(Debug, Clone)]
pub struct DeployPaths {
    pub backend_tst: PathBuf,
    pub backend_prd: PathBuf,
    pub frontend_tst: PathBuf,
    pub frontend_prd: PathBuf,
}

impl DeployPaths {
    /// Resolve the backend destination for an environment
    pub fn backend(&self, environment: Environment) -> &PathBuf {
        match environment {
            Environment::Tst => &self.backend_tst,
            Environment::Prd => &self.backend_prd,
        }
    }

    /// Resolve the frontend destination for an environment
    pub fn frontend(&self, environment: Environment) -> &PathBuf {
        match environment {
            Environment::Tst => &self.frontend_tst,
            Environment::Prd => &self.frontend_prd,
        }
    }
}

/// Full server configuration
#[derive(Debug)]
pub struct Config {
    /// Shared secret checked against the request `token` field
    pub deploy_secret: SecretString,

    /// Port the HTTP server listens on
    pub port: u16,

    /// GitHub access token for artifact download and private clones
    pub github_token: SecretString,

    /// Deployment destination paths
    pub paths: DeployPaths,
}

const VAR_SECRET: &str = "DEPLOY_SECRET_TOKEN";
const VAR_PORT: &str = "DEPLOY_SERVER_PORT";
const VAR_GITHUB_TOKEN: &str = "GITHUB_ACCESS_TOKEN";
const VAR_BACKEND_TST: &str = "DEPLOY_BACKEND_PATH_TST";
const VAR_BACKEND_PRD: &str = "DEPLOY_BACKEND_PATH_PRD";
const VAR_FRONTEND_TST: &str = "DEPLOY_FRONTEND_PATH_TST";
const VAR_FRONTEND_PRD: &str = "DEPLOY_FRONTEND_PATH_PRD";

const DEFAULT_PORT: u16 = 3001;

impl Config {
    /// Load and validate configuration from process environment variables
    pub fn from_env() -> Result<Self, DeployError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// All missing required variables are reported together in a single
    /// error so the operator can fix the `.env` file in one pass.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, DeployError> {
        let required = [
            VAR_SECRET,
            VAR_GITHUB_TOKEN,
            VAR_BACKEND_TST,
            VAR_BACKEND_PRD,
            VAR_FRONTEND_TST,
            VAR_FRONTEND_PRD,
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|name| get(name).map(|v| v.trim().is_empty()).unwrap_or(true))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(DeployError::ConfigError(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let port = match get(VAR_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                DeployError::ConfigError(format!("{} must be a valid port number, got \"{}\"", VAR_PORT, raw))
            })?,
            None => DEFAULT_PORT,
        };

        let path = |name: &str| PathBuf::from(get(name).unwrap_or_default());

        Ok(Self {
            deploy_secret: SecretString::from(get(VAR_SECRET).unwrap_or_default()),
            port,
            github_token: SecretString::from(get(VAR_GITHUB_TOKEN).unwrap_or_default()),
            paths: DeployPaths {
                backend_tst: path(VAR_BACKEND_TST),
                backend_prd: path(VAR_BACKEND_PRD),
                frontend_tst: path(VAR_FRONTEND_TST),
                frontend_prd: path(VAR_FRONTEND_PRD),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn full_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (VAR_SECRET, "s3cret"),
            (VAR_GITHUB_TOKEN, "ghp_token"),
            (VAR_BACKEND_TST, "/srv/tst/backend"),
            (VAR_BACKEND_PRD, "/srv/prd/backend"),
            (VAR_FRONTEND_TST, "/srv/tst/frontend"),
            (VAR_FRONTEND_PRD, "/srv/prd/frontend"),
        ])
    }

    #[test]
    fn test_all_missing_vars_reported_together() {
        let err = Config::from_vars(|_| None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(VAR_SECRET));
        assert!(msg.contains(VAR_GITHUB_TOKEN));
        assert!(msg.contains(VAR_FRONTEND_PRD));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut vars = full_vars();
        vars.insert(VAR_SECRET, "   ");
        let err = Config::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap_err();
        assert!(err.to_string().contains(VAR_SECRET));
        assert!(!err.to_string().contains(VAR_GITHUB_TOKEN));
    }

    #[test]
    fn test_port_defaults_when_unset() {
        let vars = full_vars();
        let config = Config::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 3001);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut vars = full_vars();
        vars.insert(VAR_PORT, "not-a-port");
        let err = Config::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, DeployError::ConfigError(_)));
    }

    #[test]
    fn test_path_resolution_per_environment() {
        let vars = full_vars();
        let config = Config::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.paths.backend(Environment::Tst), &PathBuf::from("/srv/tst/backend"));
        assert_eq!(config.paths.frontend(Environment::Prd), &PathBuf::from("/srv/prd/frontend"));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("tst".parse::<Environment>().unwrap(), Environment::Tst);
        assert_eq!("prd".parse::<Environment>().unwrap(), Environment::Prd);
        assert!("prod".parse::<Environment>().is_err());
        assert!("TST".parse::<Environment>().is_err());
        assert!("".parse::<Environment>().is_err());
    }
}
