//! Signed-in user and session records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new<S: Into<String>>(id: S, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// Email when known, otherwise the id
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub signed_in_at: DateTime<Utc>,
    /// Identity provider that issued the session
    pub provider: String,
}

impl Session {
    pub fn new<S: Into<String>>(user: User, provider: S) -> Self {
        Self {
            user,
            signed_in_at: Utc::now(),
            provider: provider.into(),
        }
    }
}
