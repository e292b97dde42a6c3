//! Shared helpers for integration tests
//!
//! `FakeBalancer` is a scripted [`Transport`]: responses are queued per
//! method and path, and every request is recorded for later inspection.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use vaultkrate::api::{
    ApiFailure, ApiRequest, ApiResponse, BalancerClient, MemorySink, Method, Transport,
};
use vaultkrate::config::{Endpoints, Locale};

pub const BALANCER: &str = "https://balancer.test";
pub const SITE: &str = "https://site.test";

type Reply = Result<ApiResponse, ApiFailure>;

#[derive(Default)]
pub struct FakeBalancer {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeBalancer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a reply for `method` on `path` (query string ignored)
    pub fn reply(&self, method: Method, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.reply(method, path, Ok(ApiResponse::json_body(status, &body)));
    }

    pub fn status(&self, method: Method, path: &str, status: u16) {
        self.reply(method, path, Ok(ApiResponse::new(status, Vec::new())));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && path_of(&r.url) == path)
            .collect()
    }
}

fn path_of(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    without_query
        .strip_prefix(BALANCER)
        .unwrap_or(without_query)
        .to_string()
}

#[async_trait]
impl Transport for FakeBalancer {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiFailure> {
        let key = (request.method, path_of(&request.url));
        self.requests.lock().unwrap().push(request);

        self.routes
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(ApiResponse::new(404, Vec::new())))
    }
}

pub fn client(balancer: &Arc<FakeBalancer>, sink: &Arc<MemorySink>) -> BalancerClient {
    BalancerClient::new(
        balancer.clone(),
        Endpoints::new(BALANCER, SITE),
        sink.clone(),
        Locale::En,
    )
}

pub fn file_json(file_id: &str, user_id: Option<&str>) -> Value {
    serde_json::json!({
        "file_id": file_id,
        "user_id": user_id,
        "size": 2048,
        "server_id": "server-1",
        "uploaded_at": "2024-06-01T10:00:00Z",
        "description": "quarterly report",
        "file_name": "report",
        "mime_type": "application/pdf",
        "download_count": 2,
        "last_access": "2024-06-02T08:30:00"
    })
}

pub fn user_json(user_id: &str) -> Value {
    serde_json::json!({
        "user_id": user_id,
        "file_count": 1,
        "space_used": 2048,
        "space_limit": 1073741824u64
    })
}
