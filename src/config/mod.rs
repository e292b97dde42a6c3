//! Configuration management module
//!
//! This module handles configuration loading, validation, and persistence
//! from command-line arguments, environment variables, the configuration
//! file and default values, plus the balancer endpoint table.

pub mod endpoints;
pub mod settings;

pub use endpoints::Endpoints;
pub use settings::*;
