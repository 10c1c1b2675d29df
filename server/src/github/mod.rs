//! GitHub REST API access

pub mod client;
