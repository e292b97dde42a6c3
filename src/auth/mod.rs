//! Authentication module
//!
//! This module provides session persistence and the application-wide
//! authentication context.

pub mod context;
pub mod provider;
pub mod session;

pub use context::{AuthContext, AuthEvent, AuthState, Subscription, UserRegistry};
pub use provider::{FileSessionProvider, MemorySessionProvider, SessionProvider};
pub use session::{Session, User};
