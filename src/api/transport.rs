//! HTTP transport seam
//!
//! Requests and responses are plain owned values so the rest of the crate
//! can be exercised against a mocked transport. `HttpTransport` is the
//! `reqwest` implementation used by the CLI.

use crate::api::failure::ApiFailure;
use crate::error::{Result, VaultKrateError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

/// One field of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub data: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl FormPart {
    /// Binary part, sent the way browsers send a `Blob` form field
    pub fn blob<S: Into<String>>(name: S, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            file_name: Some("blob".to_string()),
            content_type: Some("application/octet-stream".to_string()),
        }
    }

    pub fn text<S: Into<String>, T: Into<String>>(name: S, value: T) -> Self {
        Self {
            name: name.into(),
            data: value.into().into_bytes(),
            file_name: None,
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    /// Overrides the client-wide request timeout
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: Method, url: S, body: RequestBody) -> Self {
        Self {
            method,
            url: url.into(),
            body,
            timeout: None,
        }
    }

    pub fn get<S: Into<String>>(url: S) -> Self {
        Self::new(Method::Get, url, RequestBody::Empty)
    }

    pub fn delete<S: Into<String>>(url: S) -> Self {
        Self::new(Method::Delete, url, RequestBody::Empty)
    }

    pub fn post_json<S: Into<String>>(url: S, body: serde_json::Value) -> Self {
        Self::new(Method::Post, url, RequestBody::Json(body))
    }

    pub fn put_json<S: Into<String>>(url: S, body: serde_json::Value) -> Self {
        Self::new(Method::Put, url, RequestBody::Json(body))
    }

    pub fn multipart<S: Into<String>>(url: S, parts: Vec<FormPart>) -> Self {
        Self::new(Method::Post, url, RequestBody::Multipart(parts))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parts named `name`, in the order they were appended
    pub fn parts_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormPart> + 'a {
        let parts: &[FormPart] = match &self.body {
            RequestBody::Multipart(parts) => parts,
            _ => &[],
        };
        parts.iter().filter(move |p| p.name == name)
    }
}

/// Raw response from the balancer; interpretation is up to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_length: Option<u64>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        let content_length = Some(body.len() as u64);
        Self {
            status,
            body,
            content_length,
        }
    }

    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string().into_bytes())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            VaultKrateError::serialization(format!("Failed to parse response body: {}", e))
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turn a non-success response into the failure taxonomy
    pub fn into_failure(self) -> ApiFailure {
        ApiFailure::Http {
            status: self.status,
            body: self.body,
        }
    }
}

/// Sends requests to the balancer
///
/// Implementations return `Ok` for every HTTP response, success or not,
/// and reserve `Err` for requests that never produced a response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, ApiFailure>;
}

/// Configuration for HTTP client with proper timeouts
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            user_agent: format!("vk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| VaultKrateError::network(format!("Failed to create HTTP client: {}", e)))
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        Ok(Self {
            client: create_http_client(config)?,
        })
    }

    fn build_form(parts: Vec<FormPart>) -> std::result::Result<Form, ApiFailure> {
        let mut form = Form::new();
        for part in parts {
            let mut field = Part::bytes(part.data);
            if let Some(file_name) = part.file_name {
                field = field.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                field = field
                    .mime_str(&content_type)
                    .map_err(|e| ApiFailure::unknown(format!("Invalid content type: {}", e)))?;
            }
            form = form.part(part.name, field);
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, ApiFailure> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiFailure::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiFailure::from_reqwest(&e))?
            .to_vec();

        Ok(ApiResponse {
            status,
            body,
            content_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_success_range() {
        assert!(ApiResponse::new(200, vec![]).is_success());
        assert!(ApiResponse::new(204, vec![]).is_success());
        assert!(!ApiResponse::new(302, vec![]).is_success());
        assert!(!ApiResponse::new(404, vec![]).is_success());
    }

    #[test]
    fn test_response_json() {
        let response = ApiResponse::json_body(200, &json!({"file_id": "abc"}));
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["file_id"], "abc");

        let broken = ApiResponse::new(200, b"not json".to_vec());
        assert!(broken.json::<serde_json::Value>().is_err());
    }

    #[test]
    fn test_parts_named_preserves_order() {
        let request = ApiRequest::multipart(
            "http://localhost/upload",
            vec![
                FormPart::blob("file_data", vec![1]),
                FormPart::blob("file_data", vec![2]),
                FormPart::text("metadata", "{}"),
            ],
        );

        let chunks: Vec<u8> = request
            .parts_named("file_data")
            .map(|p| p.data[0])
            .collect();
        assert_eq!(chunks, vec![1, 2]);
        assert_eq!(request.parts_named("metadata").count(), 1);
        assert_eq!(ApiRequest::get("http://x").parts_named("file_data").count(), 0);
    }

    #[test]
    fn test_into_failure_keeps_status_and_body() {
        let failure = ApiResponse::new(413, b"too big".to_vec()).into_failure();
        match failure {
            ApiFailure::Http { status, body } => {
                assert_eq!(status, 413);
                assert_eq!(body, b"too big".to_vec());
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}
