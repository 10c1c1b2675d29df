//! GitHub token diagnostics
//!
//! Read-only checks run from the CLI (`--diagnostic`): offline token format
//! classification plus online introspection of the token's identity, scopes
//! and access to the repository endpoints the deploy path needs. Not part
//! of the deploy path.

use anyhow::{bail, Context};
use colored::Colorize;
use secrecy::SecretString;

use crate::github::client::GithubClient;

/// Recognized GitHub token formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    FineGrained,
    Classic,
    OAuth,
    UserToServer,
    ServerToServer,
    Unknown,
}

impl TokenKind {
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::FineGrained => "Fine-grained personal access token",
            TokenKind::Classic => "Classic personal access token",
            TokenKind::OAuth => "OAuth token",
            TokenKind::UserToServer => "User-to-server token",
            TokenKind::ServerToServer => "Server-to-server token",
            TokenKind::Unknown => "Unrecognized token format",
        }
    }
}

/// Classify a token by its well-known prefix
pub fn classify_token(token: &str) -> TokenKind {
    if token.starts_with("github_pat_") {
        TokenKind::FineGrained
    } else if token.starts_with("ghp_") {
        TokenKind::Classic
    } else if token.starts_with("gho_") {
        TokenKind::OAuth
    } else if token.starts_with("ghu_") {
        TokenKind::UserToServer
    } else if token.starts_with("ghs_") {
        TokenKind::ServerToServer
    } else {
        TokenKind::Unknown
    }
}

/// Check the token only contains characters GitHub tokens use
pub fn has_valid_charset(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check(ok: bool, label: &str) {
    if ok {
        println!("  {} {}", "✓".green(), label);
    } else {
        println!("  {} {}", "✗".red(), label);
    }
}

/// Run token diagnostics. `repo` optionally names an `owner/name` repository
/// whose Actions endpoints get probed with the token.
pub async fn run_diagnostic(repo: Option<&str>) -> anyhow::Result<()> {
    let token = std::env::var("GITHUB_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    println!("{}", "GitHub token diagnostics".bold());
    println!();

    let Some(token) = token else {
        bail!("GITHUB_ACCESS_TOKEN is not configured");
    };

    // Offline format checks
    let kind = classify_token(&token);
    println!("Format:");
    check(kind != TokenKind::Unknown, kind.describe());
    check(
        (40..=255).contains(&token.len()),
        &format!("Length {} (expected 40-255)", token.len()),
    );
    check(has_valid_charset(&token), "Character set");
    println!();

    // Online introspection
    let client = GithubClient::new(&SecretString::from(token))
        .context("Failed to build GitHub client")?;

    println!("Token introspection:");
    let introspection = client
        .introspect_token()
        .await
        .context("Token introspection failed")?;
    check(true, &format!("Valid for user: {}", introspection.login));
    println!(
        "    Email: {}",
        introspection.email.as_deref().unwrap_or("not public")
    );
    println!(
        "    Scopes: {}",
        introspection
            .scopes
            .as_deref()
            .unwrap_or("not available (fine-grained token)")
    );
    if let Some(accepted) = introspection.accepted_scopes.as_deref() {
        println!("    Accepted scopes: {}", accepted);
    }
    println!();

    if let Some(repo) = repo {
        println!("Repository access ({}):", repo);
        let probes = [
            ("Workflow runs", format!("/repos/{}/actions/runs?per_page=1", repo)),
            ("Artifacts", format!("/repos/{}/actions/artifacts?per_page=1", repo)),
            ("Contents", format!("/repos/{}/contents", repo)),
            ("Repository metadata", format!("/repos/{}", repo)),
        ];
        for (label, path) in probes {
            let status = client.probe(&path).await?;
            check(status.is_success(), &format!("{} ({})", label, status.as_u16()));
        }
    }

    Ok(())
}
