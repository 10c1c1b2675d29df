//! Deploy Webhook Server - Entry Point
//!
//! Webhook-triggered deployment receiver: accepts HTTP requests naming a
//! target environment and a source artifact (prebuilt frontend bundle or
//! backend branch), materializes it on disk and restarts the corresponding
//! PM2 process.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use deploy_webhook::config::Config;
use deploy_webhook::deploy::supervisor::Pm2Supervisor;
use deploy_webhook::deploy::Deployer;
use deploy_webhook::diag::run_diagnostic;
use deploy_webhook::github::client::GithubClient;
use deploy_webhook::logs::{init_logging, LogOptions};
use deploy_webhook::server::serve::serve;
use deploy_webhook::server::state::ServerState;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!("deploy-webhook {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    // Run token diagnostics
    if cli_args.contains_key("diagnostic") || cli_args.contains_key("diag") {
        if let Err(e) = run_diagnostic(cli_args.get("repo").map(String::as_str)).await {
            eprintln!("Diagnostic failed: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: env::var("LOG_LEVEL")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default(),
        json_format: env::var("LOG_JSON").map(|v| v == "true").unwrap_or(false),
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Load and validate configuration before accepting any request
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("{}", e);
            error!("Define the missing variables in your .env file before starting the server");
            std::process::exit(1);
        }
    };

    let github = match GithubClient::new(&config.github_token) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build GitHub client: {}", e);
            std::process::exit(1);
        }
    };

    let deployer = Arc::new(Deployer::new(config.clone(), github, Arc::new(Pm2Supervisor)));
    let state = Arc::new(ServerState::new(deployer));

    info!("Deploy webhook server {} starting", env!("CARGO_PKG_VERSION"));

    let handle = match serve(config.port, state, await_shutdown_signal()).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    match handle.await {
        Ok(Ok(())) => info!("Server stopped"),
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
