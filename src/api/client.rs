//! Balancer client: sends requests, times them, and turns failures into
//! classified errors.

use crate::api::classify::{classify, Classification, ClassifyContext};
use crate::api::diagnostics::{DiagnosticSink, OperationLog, Severity, TracingSink};
use crate::api::failure::ApiFailure;
use crate::api::transport::{ApiRequest, ApiResponse, HttpTransport, NetworkConfig, Transport};
use crate::config::{Config, Endpoints, Locale};
use crate::diag_context;
use crate::error::{Result, VaultKrateError};
use serde::de::DeserializeOwned;
use std::sync::Arc;

const MAX_LOGGED_BODY: usize = 2048;

#[derive(Clone)]
pub struct BalancerClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    sink: Arc<dyn DiagnosticSink>,
    locale: Locale,
}

impl BalancerClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        sink: Arc<dyn DiagnosticSink>,
        locale: Locale,
    ) -> Self {
        Self {
            transport,
            endpoints,
            sink,
            locale,
        }
    }

    /// Client backed by `reqwest`, logging through `tracing`
    pub fn from_config(config: &Config) -> Result<Self> {
        let network = NetworkConfig {
            connect_timeout: config.api_timeout(),
            request_timeout: config.api_timeout(),
            ..NetworkConfig::default()
        };
        let transport = HttpTransport::new(&network)?;

        Ok(Self::new(
            Arc::new(transport),
            Endpoints::from_config(config),
            Arc::new(TracingSink),
            config.locale,
        ))
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    pub fn operation<S: Into<String>>(&self, name: S) -> OperationLog<'_> {
        OperationLog::start(self.sink.as_ref(), name)
    }

    /// Send a request and hand back whatever the balancer answered
    pub async fn send_raw(
        &self,
        log: &OperationLog<'_>,
        request: ApiRequest,
    ) -> std::result::Result<ApiResponse, ApiFailure> {
        log.debug(format!("{} {}", request.method, request.url));

        let result = self.transport.send(request).await;

        match &result {
            Ok(response) => log.emit(
                Severity::Debug,
                format!("Response received in {}ms", log.elapsed_ms()),
                diag_context!(
                    "status" => response.status,
                    "elapsed_ms" => log.elapsed_ms(),
                    "content_length" => response.content_length
                ),
            ),
            Err(failure) => log.emit(
                Severity::Debug,
                format!("Request failed after {}ms: {}", log.elapsed_ms(), failure),
                diag_context!("elapsed_ms" => log.elapsed_ms()),
            ),
        }

        result
    }

    /// Send a request, treating any non-success status as a failure
    pub async fn execute(
        &self,
        log: &OperationLog<'_>,
        request: ApiRequest,
        context: ClassifyContext,
    ) -> Result<ApiResponse> {
        match self.send_raw(log, request).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(self.fail(log, response.into_failure(), context)),
            Err(failure) => Err(self.fail(log, failure, context)),
        }
    }

    /// Like [`execute`](Self::execute), decoding the JSON body
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        log: &OperationLog<'_>,
        request: ApiRequest,
        context: ClassifyContext,
    ) -> Result<T> {
        let response = self.execute(log, request, context).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            self.fail(
                log,
                ApiFailure::unknown(format!("Failed to parse response body: {}", e)),
                context,
            )
        })
    }

    pub fn classify(&self, failure: &ApiFailure, context: ClassifyContext) -> Classification {
        classify(failure, context, self.locale)
    }

    /// Classify a failure, report it to the diagnostic sink and convert it
    /// into the error surfaced to the user
    pub fn fail(
        &self,
        log: &OperationLog<'_>,
        failure: ApiFailure,
        context: ClassifyContext,
    ) -> VaultKrateError {
        let classification = self.classify(&failure, context);
        self.report(log, &failure, &classification);
        VaultKrateError::api(classification.category, classification.message)
    }

    pub fn report(
        &self,
        log: &OperationLog<'_>,
        failure: &ApiFailure,
        classification: &Classification,
    ) {
        let mut extra = diag_context!(
            "category" => classification.category.as_str(),
            "detail" => classification.detail,
            "elapsed_ms" => log.elapsed_ms(),
            "timestamp" => chrono::Utc::now().to_rfc3339()
        );

        if let Some(status) = failure.status() {
            extra.insert("status".to_string(), status.into());
        }

        if let Some(body) = failure.body_text() {
            let truncated: String = body.chars().take(MAX_LOGGED_BODY).collect();
            extra.insert("response_body".to_string(), truncated.into());
        }

        if let Some(server) = &classification.failed_server {
            if let Ok(value) = serde_json::to_value(server) {
                extra.insert("failed_server".to_string(), value);
            }
        }

        if matches!(failure, ApiFailure::Network { .. }) {
            extra.insert(
                "balancer_url".to_string(),
                self.endpoints.balancer_url().into(),
            );
        }

        log.error(format!("API error - {}: {}", log.operation(), failure), extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::classify::ErrorCategory;
    use crate::api::diagnostics::MemorySink;
    use crate::api::transport::MockTransport;
    use serde_json::json;

    fn client_with(mock: MockTransport, sink: Arc<MemorySink>) -> BalancerClient {
        BalancerClient::new(
            Arc::new(mock),
            Endpoints::new("https://balancer.test", "https://site.test"),
            sink,
            Locale::En,
        )
    }

    #[tokio::test]
    async fn test_execute_success_passes_response_through() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok(ApiResponse::json_body(200, &json!({"ok": true}))));

        let sink = Arc::new(MemorySink::new());
        let client = client_with(mock, sink.clone());
        let log = client.operation("Probe");

        let value: serde_json::Value = client
            .fetch_json(&log, ApiRequest::get("https://balancer.test/x"), ClassifyContext::General)
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert!(sink
            .events_for("Probe")
            .iter()
            .all(|e| e.severity < Severity::Warn));
    }

    #[tokio::test]
    async fn test_execute_classifies_and_logs_http_failure() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Ok(ApiResponse::new(413, b"payload too large".to_vec())));

        let sink = Arc::new(MemorySink::new());
        let client = client_with(mock, sink.clone());
        let log = client.operation("File Upload").context_field("file_name", "big.iso");

        let err = client
            .execute(&log, ApiRequest::get("https://balancer.test/x"), ClassifyContext::General)
            .await
            .unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::FileSize));

        let errors: Vec<_> = sink
            .events_for("File Upload")
            .into_iter()
            .filter(|e| e.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].fields["status"], 413);
        assert_eq!(errors[0].fields["file_name"], "big.iso");
        assert_eq!(errors[0].fields["response_body"], "payload too large");
    }

    #[tokio::test]
    async fn test_network_failure_logs_balancer_url() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Err(ApiFailure::network("connection refused")));

        let sink = Arc::new(MemorySink::new());
        let client = client_with(mock, sink.clone());
        let log = client.operation("Fetch User Info");

        let err = client
            .execute(&log, ApiRequest::get("https://balancer.test/x"), ClassifyContext::General)
            .await
            .unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::Network));

        let event = sink
            .events()
            .into_iter()
            .find(|e| e.severity == Severity::Error)
            .unwrap();
        assert_eq!(event.fields["balancer_url"], "https://balancer.test");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_generic() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Ok(ApiResponse::new(200, b"<html>".to_vec())));

        let client = client_with(mock, Arc::new(MemorySink::new()));
        let log = client.operation("Fetch");

        let err = client
            .fetch_json::<serde_json::Value>(
                &log,
                ApiRequest::get("https://balancer.test/x"),
                ClassifyContext::General,
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::Generic));
    }
}
