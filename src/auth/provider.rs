//! Session provider trait and implementations
//!
//! A provider owns the persisted session. `FileSessionProvider` keeps it as
//! JSON in the configuration directory; `MemorySessionProvider` keeps it in
//! process.

use crate::auth::session::{Session, User};
use crate::config::Config;
use crate::error::{Result, VaultKrateError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub const SESSION_FILE_NAME: &str = "session.json";

/// Trait for session providers
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The persisted session, if any
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Start a session for `user`, replacing any existing one
    async fn sign_in(&self, user: User) -> Result<Session>;

    /// Sign out and clear the persisted session
    async fn sign_out(&self) -> Result<()>;

    /// Short provider name recorded on sessions
    fn name(&self) -> &str;
}

/// Session stored as a JSON file
#[derive(Debug, Clone)]
pub struct FileSessionProvider {
    path: PathBuf,
}

impl FileSessionProvider {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Provider using `session.json` next to the config file
    pub fn from_default_location() -> Result<Self> {
        Ok(Self::new(Config::config_dir()?.join(SESSION_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionProvider for FileSessionProvider {
    async fn get_session(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let session: Session = serde_json::from_str(&content).map_err(|e| {
            VaultKrateError::authentication(format!(
                "Corrupt session file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(session))
    }

    async fn sign_in(&self, user: User) -> Result<Session> {
        let session = Session::new(user, self.name());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&session)?).await?;

        debug!("Session written to {}", self.path.display());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// In-process session, lost when the process exits
#[derive(Debug, Default)]
pub struct MemorySessionProvider {
    session: Mutex<Option<Session>>,
}

impl MemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: User) -> Self {
        Self {
            session: Mutex::new(Some(Session::new(user, "memory"))),
        }
    }
}

#[async_trait]
impl SessionProvider for MemorySessionProvider {
    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().await.clone())
    }

    async fn sign_in(&self, user: User) -> Result<Session> {
        let session = Session::new(user, self.name());
        *self.session.lock().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.lock().await = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
