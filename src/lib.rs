//! vaultkrate - Vault-Krate file sharing client
//!
//! Upload files through a Vault-Krate balancer, manage and share them, and
//! watch the health of the storage servers behind it.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod health;
pub mod utils;

/// Build information generated by `build.rs`
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Re-export commonly used types
pub use error::{Result, VaultKrateError};
