//! Balancer endpoint paths and URL builders

use crate::config::Config;
use crate::error::Result;
use url::Url;

pub const HEALTH_STATUS: &str = "/health-status";
pub const FILES_INFO: &str = "/files/info";
pub const FILES_DELETE: &str = "/files/delete";
pub const FILES_DOWNLOAD: &str = "/files/download";
pub const FILES_UPLOAD_CHUNKED: &str = "/files/upload/chunked";
pub const FILES_UPLOAD_TEMP_CHUNKED: &str = "/files/upload/temp/chunked";
pub const USERS_INFO: &str = "/users/info";
pub const USERS_REGISTER: &str = "/users/register";

/// Builds every URL the client talks to from the configured base URLs
#[derive(Debug, Clone)]
pub struct Endpoints {
    balancer_url: String,
    site_url: String,
}

impl Endpoints {
    pub fn new<B: Into<String>, S: Into<String>>(balancer_url: B, site_url: S) -> Self {
        Self {
            balancer_url: balancer_url.into().trim_end_matches('/').to_string(),
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.balancer_url.clone(), config.site_url.clone())
    }

    pub fn balancer_url(&self) -> &str {
        &self.balancer_url
    }

    pub fn build_api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.balancer_url, endpoint)
    }

    fn with_query(&self, endpoint: &str, key: &str, value: &str) -> Result<String> {
        let mut url = Url::parse(&self.build_api_url(endpoint))?;
        url.query_pairs_mut().append_pair(key, value);
        Ok(url.into())
    }

    pub fn health_status_url(&self) -> String {
        self.build_api_url(HEALTH_STATUS)
    }

    pub fn file_info_by_user_url(&self, user_id: &str) -> Result<String> {
        self.with_query(FILES_INFO, "user_id", user_id)
    }

    pub fn file_info_by_id_url(&self, file_id: &str) -> Result<String> {
        self.with_query(FILES_INFO, "file_id", file_id)
    }

    pub fn file_update_url(&self) -> String {
        self.build_api_url(FILES_INFO)
    }

    pub fn file_delete_url(&self, file_id: &str) -> Result<String> {
        self.with_query(FILES_DELETE, "file_id", file_id)
    }

    pub fn file_download_url(&self, file_id: &str) -> Result<String> {
        self.with_query(FILES_DOWNLOAD, "file_id", file_id)
    }

    /// Anonymous uploads use the temporary endpoint
    pub fn chunked_upload_url(&self, temporary: bool) -> String {
        if temporary {
            self.build_api_url(FILES_UPLOAD_TEMP_CHUNKED)
        } else {
            self.build_api_url(FILES_UPLOAD_CHUNKED)
        }
    }

    pub fn user_info_url(&self, user_id: &str) -> Result<String> {
        self.with_query(USERS_INFO, "user_id", user_id)
    }

    pub fn user_register_url(&self) -> String {
        self.build_api_url(USERS_REGISTER)
    }

    /// Public link to the file-detail page for `file_id`
    pub fn share_link(&self, file_id: &str) -> String {
        format!("{}/file/{}", self.site_url, file_id)
    }
}
