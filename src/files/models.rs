//! Data models for file operations
//!
//! This module defines the records the balancer returns for files and
//! users, and the metadata sent along with an upload.

use crate::files::expiry::{clamp_delete_at, ExpiryAdjustment};
use crate::utils::datetime::flexible;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Information about a stored file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    /// Owner, `None` for anonymous uploads
    #[serde(default)]
    pub user_id: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub server_id: String,
    #[serde(with = "flexible")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub file_name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub download_count: u64,
    #[serde(with = "flexible::option", default, skip_serializing_if = "Option::is_none")]
    pub last_access: Option<DateTime<Utc>>,
    #[serde(with = "flexible::option", default, skip_serializing_if = "Option::is_none")]
    pub delete_at: Option<DateTime<Utc>>,
}

/// Aggregate storage usage for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: String,
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub space_used: u64,
    #[serde(default)]
    pub space_limit: u64,
}

impl UserInfo {
    pub fn usage_percentage(&self) -> f64 {
        if self.space_limit == 0 {
            return 0.0;
        }
        self.space_used as f64 / self.space_limit as f64 * 100.0
    }
}

/// Metadata describing an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub user_id: Option<String>,
    pub description: String,
    pub file_name: String,
    pub mime_type: String,
    #[serde(with = "flexible::option", default, skip_serializing_if = "Option::is_none")]
    pub delete_at: Option<DateTime<Utc>>,
}

/// The `metadata` form field of a chunked upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedUploadMetadata {
    #[serde(flatten)]
    pub metadata: UploadMetadata,
    pub total_size: u64,
    pub chunk_count: usize,
    pub is_temporary: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResult {
    pub file_id: String,
}

/// What an upload produced, as reported to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub file_id: String,
    pub share_link: String,
    pub total_size: u64,
    pub chunk_count: usize,
    pub temporary: bool,
    pub delete_at: Option<DateTime<Utc>>,
}

/// Change to a file's scheduled deletion
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum DeleteAtChange {
    #[default]
    Keep,
    Clear,
    Set(DateTime<Utc>),
}

/// Edits to the mutable fields of a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileUpdate {
    pub file_name: Option<String>,
    pub description: Option<String>,
    pub delete_at: DeleteAtChange,
}

impl FileUpdate {
    pub fn is_empty(&self) -> bool {
        self.file_name.is_none()
            && self.description.is_none()
            && self.delete_at == DeleteAtChange::Keep
    }

    /// Apply the edits to `file`, enforcing the minimum deletion lead time.
    /// Returns the adjustment when a deletion time was set.
    pub fn apply(&self, file: &mut FileInfo, now: DateTime<Utc>) -> Option<ExpiryAdjustment> {
        if let Some(name) = &self.file_name {
            file.file_name = name.clone();
        }
        if let Some(description) = &self.description {
            file.description = description.clone();
        }

        match self.delete_at {
            DeleteAtChange::Keep => None,
            DeleteAtChange::Clear => {
                file.delete_at = None;
                None
            }
            DeleteAtChange::Set(requested) => {
                let adjustment = clamp_delete_at(requested, now);
                file.delete_at = Some(adjustment.value);
                Some(adjustment)
            }
        }
    }
}
