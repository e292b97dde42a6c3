//! File storage operations
//!
//! This module provides the chunked uploader, CRUD operations on stored
//! files, deletion scheduling rules and the signed-in dashboard.

pub mod chunked;
pub mod dashboard;
pub mod expiry;
pub mod manager;
pub mod models;

pub use chunked::{build_chunked_upload, split_into_chunks, upload_file_chunked, CHUNK_SIZE};
pub use dashboard::{Dashboard, DashboardState};
pub use expiry::{clamp_delete_at, ExpiryAdjustment, ExpiryStatus};
pub use manager::FileManager;
pub use models::{DeleteAtChange, FileInfo, FileUpdate, UploadMetadata, UploadOutcome, UserInfo};
