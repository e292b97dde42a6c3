//! File operations against the balancer

use crate::api::classify::ClassifyContext;
use crate::api::client::BalancerClient;
use crate::api::transport::ApiRequest;
use crate::auth::User;
use crate::diag_context;
use crate::error::{Result, VaultKrateError};
use crate::files::chunked::upload_file_chunked;
use crate::files::expiry::{anonymous_delete_at, ExpiryAdjustment};
use crate::files::models::{
    FileInfo, FileUpdate, UploadMetadata, UploadOutcome, UploadResult, UserInfo,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info};

/// Name shown for an uploaded file: the file name minus its last extension
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => name[..idx].to_string(),
        _ => name,
    }
}

pub fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Metadata for uploading `path`; anonymous uploads expire after a day
pub fn upload_metadata(
    path: &Path,
    description: &str,
    user: Option<&User>,
    now: DateTime<Utc>,
) -> UploadMetadata {
    UploadMetadata {
        user_id: user.map(|u| u.id.clone()),
        description: description.to_string(),
        file_name: display_name(path),
        mime_type: guess_mime_type(path),
        delete_at: if user.is_none() {
            Some(anonymous_delete_at(now))
        } else {
            None
        },
    }
}

/// File manager for balancer-backed storage
#[derive(Clone)]
pub struct FileManager {
    client: BalancerClient,
}

impl FileManager {
    pub fn new(client: BalancerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BalancerClient {
        &self.client
    }

    /// List every file owned by `user_id`
    pub async fn list_files(&self, user_id: &str) -> Result<Vec<FileInfo>> {
        let log = self
            .client
            .operation("Fetch User Files")
            .context_field("user_id", user_id);
        let url = self.client.endpoints().file_info_by_user_url(user_id)?;

        let files: Vec<FileInfo> = self
            .client
            .fetch_json(&log, ApiRequest::get(url), ClassifyContext::General)
            .await?;

        debug!("Fetched {} file(s) for user {}", files.len(), user_id);
        Ok(files)
    }

    /// Fetch one file's record; missing or expired files classify as `notfound`/`expired`
    pub async fn file_info(&self, file_id: &str) -> Result<FileInfo> {
        let log = self
            .client
            .operation("Fetch File Info")
            .context_field("file_id", file_id);
        let url = self.client.endpoints().file_info_by_id_url(file_id)?;

        self.client
            .fetch_json(&log, ApiRequest::get(url), ClassifyContext::File)
            .await
    }

    pub async fn user_info(&self, user_id: &str) -> Result<UserInfo> {
        let log = self
            .client
            .operation("Fetch User Info")
            .context_field("user_id", user_id);
        let url = self.client.endpoints().user_info_url(user_id)?;

        self.client
            .fetch_json(&log, ApiRequest::get(url), ClassifyContext::General)
            .await
    }

    /// Replace a file's record with `file`
    pub async fn update_file(&self, file: &FileInfo) -> Result<()> {
        let log = self.client.operation("Update File").with_context(diag_context!(
            "file_id" => file.file_id,
            "file_name" => file.file_name
        ));
        let body = serde_json::to_value(file)?;

        self.client
            .execute(
                &log,
                ApiRequest::put_json(self.client.endpoints().file_update_url(), body),
                ClassifyContext::General,
            )
            .await?;

        info!("Updated file {}", file.file_id);
        Ok(())
    }

    /// Fetch the current record, apply `update` and store the result
    pub async fn edit_file(
        &self,
        file_id: &str,
        update: &FileUpdate,
        now: DateTime<Utc>,
    ) -> Result<(FileInfo, Option<ExpiryAdjustment>)> {
        let mut file = self.file_info(file_id).await?;
        let adjustment = update.apply(&mut file, now);
        self.update_file(&file).await?;
        Ok((file, adjustment))
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let log = self
            .client
            .operation("Delete File")
            .context_field("file_id", file_id);
        let url = self.client.endpoints().file_delete_url(file_id)?;

        self.client
            .execute(&log, ApiRequest::delete(url), ClassifyContext::General)
            .await?;

        info!("Deleted file {}", file_id);
        Ok(())
    }

    /// Download a file's content
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let log = self
            .client
            .operation("Download File")
            .context_field("file_id", file_id);
        let url = self.client.endpoints().file_download_url(file_id)?;

        let response = self
            .client
            .execute(&log, ApiRequest::get(url), ClassifyContext::File)
            .await?;

        debug!("Downloaded {} bytes for {}", response.body.len(), file_id);
        Ok(response.body)
    }

    pub fn share_link(&self, file_id: &str) -> String {
        self.client.endpoints().share_link(file_id)
    }

    /// Upload a local file; without a signed-in user the upload is temporary
    pub async fn upload_file(
        &self,
        path: &Path,
        description: &str,
        user: Option<&User>,
        now: DateTime<Utc>,
    ) -> Result<UploadOutcome> {
        let data = tokio::fs::read(path).await?;
        let metadata = upload_metadata(path, description, user, now);
        let temporary = user.is_none();
        let delete_at = metadata.delete_at;

        let log = self.client.operation("File Upload").with_context(diag_context!(
            "file_name" => metadata.file_name,
            "file_size" => data.len(),
            "mime_type" => metadata.mime_type,
            "user_id" => metadata.user_id
        ));

        let (response, upload) =
            match upload_file_chunked(&self.client, &log, &data, metadata, temporary).await {
                Ok(sent) => sent,
                Err(failure) => {
                    return Err(self.client.fail(&log, failure, ClassifyContext::General))
                }
            };

        if !response.is_success() {
            return Err(self
                .client
                .fail(&log, response.into_failure(), ClassifyContext::General));
        }

        let result: UploadResult = response.json().map_err(|e| {
            VaultKrateError::serialization(format!("Unexpected upload response: {}", e))
        })?;

        info!(
            "Uploaded {} as {} ({} chunk(s))",
            path.display(),
            result.file_id,
            upload.chunk_count
        );

        Ok(UploadOutcome {
            share_link: self.share_link(&result.file_id),
            file_id: result.file_id,
            total_size: upload.total_size,
            chunk_count: upload.chunk_count,
            temporary,
            delete_at,
        })
    }
}
