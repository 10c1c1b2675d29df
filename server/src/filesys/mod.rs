//! Filesystem operations

pub mod dir;
pub mod file;
