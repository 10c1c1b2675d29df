//! Deploy Webhook Library
//!
//! Core modules for the webhook-triggered deployment receiver.

pub mod config;
pub mod deploy;
pub mod diag;
pub mod errors;
pub mod filesys;
pub mod github;
pub mod logs;
pub mod server;
