//! CLI module for vk
//!
//! This module contains all command-line interface related functionality,
//! including command definitions, argument parsing, and command execution.

pub mod commands;
mod health_view;

pub use commands::*;
