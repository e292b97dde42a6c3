//! Signed-in user's dashboard: file list plus storage usage
//!
//! Every mutation is followed by a full refresh of both lists.

use crate::auth::User;
use crate::error::{Result, VaultKrateError};
use crate::files::expiry::ExpiryAdjustment;
use crate::files::manager::FileManager;
use crate::files::models::{FileInfo, FileUpdate, UploadOutcome, UserInfo};
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Snapshot of the dashboard after a refresh
#[derive(Debug, Default)]
pub struct DashboardState {
    pub files: Vec<FileInfo>,
    pub usage: Option<UserInfo>,
    /// Failures of the individual fetches; a failed fetch leaves its part empty
    pub errors: Vec<VaultKrateError>,
}

impl DashboardState {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Dashboard {
    manager: FileManager,
    user: User,
    uploading: AtomicBool,
}

impl Dashboard {
    pub fn new(manager: FileManager, user: User) -> Self {
        Self {
            manager,
            user,
            uploading: AtomicBool::new(false),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Fetch the file list and the usage summary concurrently
    pub async fn refresh(&self) -> DashboardState {
        let (files, usage) = futures::join!(
            self.manager.list_files(&self.user.id),
            self.manager.user_info(&self.user.id)
        );

        let mut state = DashboardState::default();
        match files {
            Ok(files) => state.files = files,
            Err(e) => state.errors.push(e),
        }
        match usage {
            Ok(usage) => state.usage = Some(usage),
            Err(e) => state.errors.push(e),
        }

        if !state.is_complete() {
            warn!("Dashboard refresh finished with {} error(s)", state.errors.len());
        }
        state
    }

    /// Upload a file as the dashboard user. Only one upload may run at a time.
    pub async fn upload(
        &self,
        path: &Path,
        description: &str,
    ) -> Result<(UploadOutcome, DashboardState)> {
        if self
            .uploading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(VaultKrateError::invalid_argument(
                "An upload is already in progress",
            ));
        }

        let result = self
            .manager
            .upload_file(path, description, Some(&self.user), Utc::now())
            .await;
        self.uploading.store(false, Ordering::SeqCst);

        let outcome = result?;
        Ok((outcome, self.refresh().await))
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    pub async fn update(
        &self,
        file_id: &str,
        update: &FileUpdate,
    ) -> Result<(Option<ExpiryAdjustment>, DashboardState)> {
        let (_, adjustment) = self.manager.edit_file(file_id, update, Utc::now()).await?;
        Ok((adjustment, self.refresh().await))
    }

    pub async fn delete(&self, file_id: &str) -> Result<DashboardState> {
        self.manager.delete_file(file_id).await?;
        Ok(self.refresh().await)
    }
}
