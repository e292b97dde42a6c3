//! Utility functions module
//!
//! This module contains date/time parsing, display formatting and
//! interactive prompt helpers.

pub mod datetime;
pub mod format;
pub mod interactive;

pub use format::*;
