//! Periodic health polling
//!
//! `HealthMonitor::spawn` starts a timer task that fetches the balancer's
//! health snapshot immediately and then once per interval. Manual refreshes
//! run as independent fetches: nothing de-duplicates them against the timer,
//! and whichever fetch resolves last owns the published view. Dropping or
//! shutting down the handle cancels the timer and any fetch still running.

use crate::api::classify::{Classification, ClassifyContext};
use crate::api::client::BalancerClient;
use crate::api::diagnostics::{OperationLog, Severity};
use crate::api::failure::ApiFailure;
use crate::api::transport::ApiRequest;
use crate::config::Config;
use crate::diag_context;
use crate::health::models::HealthStatusResponse;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a health view renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthView {
    /// Last snapshot received; kept when a later fetch fails
    pub snapshot: Option<HealthStatusResponse>,
    pub last_update: Option<DateTime<Utc>>,
    /// Error from the most recent failed fetch, cleared by the next success
    pub error: Option<Classification>,
    /// Fetches currently running
    pub in_flight: usize,
    /// Fetches that have resolved, successfully or not
    pub completed: u64,
}

impl HealthView {
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

pub struct HealthMonitor {
    client: BalancerClient,
    interval: Duration,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(client: BalancerClient, interval: Duration, timeout: Duration) -> Self {
        Self {
            client,
            interval,
            timeout,
        }
    }

    pub fn from_config(client: BalancerClient, config: &Config) -> Self {
        Self::new(
            client,
            config.health_refresh_interval(),
            config.health_timeout(),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch one snapshot from the balancer
    pub async fn fetch_once(&self) -> Result<HealthStatusResponse, Classification> {
        let url = self.client.endpoints().health_status_url();
        let log = self
            .client
            .operation("Health Status Check")
            .context_field("url", url.as_str());
        log.debug(format!("Fetching from {}", url));

        let request = ApiRequest::get(url).with_timeout(self.timeout);
        let failure = match self.client.send_raw(&log, request).await {
            Ok(response) if response.is_success() => {
                match serde_json::from_slice::<HealthStatusResponse>(&response.body) {
                    Ok(snapshot) => {
                        self.log_snapshot(&log, &snapshot);
                        return Ok(snapshot);
                    }
                    Err(e) => ApiFailure::unknown(format!("Failed to parse health status: {}", e)),
                }
            }
            Ok(response) => response.into_failure(),
            Err(failure) => failure,
        };

        let classification = self.client.classify(&failure, ClassifyContext::General);
        self.client.report(&log, &failure, &classification);
        if matches!(failure, ApiFailure::Network { .. }) {
            log.warn(format!(
                "Cannot reach balancer at {}",
                self.client.endpoints().balancer_url()
            ));
        }

        Err(classification)
    }

    fn log_snapshot(&self, log: &OperationLog<'_>, snapshot: &HealthStatusResponse) {
        let summary = &snapshot.summary;
        log.emit(
            Severity::Info,
            format!(
                "Health data received: {}/{} servers healthy",
                summary.healthy_servers, summary.total_servers
            ),
            diag_context!(
                "total_servers" => summary.total_servers,
                "healthy_servers" => summary.healthy_servers,
                "unhealthy_servers" => summary.unhealthy_servers,
                "overall_status" => summary.overall_status,
                "elapsed_ms" => log.elapsed_ms()
            ),
        );

        if summary.unhealthy_servers > 0 {
            log.warn(format!(
                "Unhealthy servers detected: {}",
                summary.unhealthy_servers
            ));
            for server in snapshot.unhealthy() {
                log.emit(
                    Severity::Error,
                    format!("Server {} is down", server.instance.instance_identifier),
                    diag_context!(
                        "url" => server.instance.assigned_url,
                        "error" => server.error,
                        "response_time_ms" => server.response_time
                    ),
                );
            }
        }

        if !snapshot.summary_is_consistent() {
            log.warn("Reported summary does not match the server list");
        }

        for server in &snapshot.servers {
            log.debug(format!(
                "{} {}: {}ms",
                if server.is_healthy() { "up" } else { "down" },
                server.instance.instance_identifier,
                server.response_time
            ));
        }
    }

    /// Start polling. The first fetch happens right away.
    pub fn spawn(self) -> MonitorHandle {
        let log = self.client.operation("Health Monitor");
        log.emit(
            Severity::Info,
            "Health monitor started",
            diag_context!(
                "balancer_url" => self.client.endpoints().balancer_url(),
                "refresh_interval_ms" => self.interval.as_millis() as u64,
                "timeout_ms" => self.timeout.as_millis() as u64
            ),
        );

        let (state, _) = watch::channel(HealthView::default());
        let shared = Arc::new(Shared {
            monitor: self,
            state,
            cancel: CancellationToken::new(),
        });

        let timer = tokio::spawn(poll_loop(shared.clone()));
        MonitorHandle {
            shared,
            timer: Some(timer),
        }
    }
}

struct Shared {
    monitor: HealthMonitor,
    state: watch::Sender<HealthView>,
    cancel: CancellationToken,
}

async fn poll_loop(shared: Arc<Shared>) {
    let mut ticker = tokio::time::interval(shared.monitor.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = ticker.tick() => {
                tokio::spawn(run_fetch(shared.clone()));
            }
        }
    }

    debug!("Health polling stopped");
}

async fn run_fetch(shared: Arc<Shared>) {
    shared.state.send_modify(|view| view.in_flight += 1);

    let result = tokio::select! {
        _ = shared.cancel.cancelled() => None,
        result = shared.monitor.fetch_once() => Some(result),
    };

    shared.state.send_modify(|view| {
        view.in_flight = view.in_flight.saturating_sub(1);
        let Some(result) = result else {
            return;
        };

        view.completed += 1;
        match result {
            Ok(snapshot) => {
                view.snapshot = Some(snapshot);
                view.last_update = Some(Utc::now());
                view.error = None;
            }
            Err(classification) => view.error = Some(classification),
        }
    });
}

/// Running monitor. Dropping it stops polling.
pub struct MonitorHandle {
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn subscribe(&self) -> watch::Receiver<HealthView> {
        self.shared.state.subscribe()
    }

    pub fn current(&self) -> HealthView {
        self.shared.state.borrow().clone()
    }

    /// Fetch now, alongside whatever the timer is doing
    pub fn refresh(&self) -> JoinHandle<()> {
        debug!("Manual health refresh");
        tokio::spawn(run_fetch(self.shared.clone()))
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    /// Stop polling and wait for the timer task to finish
    pub async fn shutdown(mut self) {
        self.shared.cancel.cancel();
        if let Some(timer) = self.timer.take() {
            let _ = timer.await;
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::classify::ErrorCategory;
    use crate::api::diagnostics::MemorySink;
    use crate::api::transport::{ApiResponse, MockTransport, Transport};
    use crate::config::{Endpoints, Locale};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(healthy: usize) -> serde_json::Value {
        let servers: Vec<serde_json::Value> = (0..healthy)
            .map(|i| {
                json!({
                    "instance": {"id": format!("id-{}", i), "instance_identifier": format!("s{}", i)},
                    "healthInfo": null,
                    "responseTime": 10,
                    "status": "healthy"
                })
            })
            .collect();
        let overall = if healthy > 0 { "all_healthy" } else { "all_unhealthy" };
        json!({
            "success": true,
            "timestamp": "2024-06-01T10:00:00Z",
            "summary": {
                "total_servers": healthy,
                "healthy_servers": healthy,
                "unhealthy_servers": 0,
                "overall_status": overall
            },
            "servers": servers
        })
    }

    fn client_with(transport: Arc<dyn Transport>, sink: Arc<MemorySink>) -> BalancerClient {
        BalancerClient::new(
            transport,
            Endpoints::new("https://balancer.test", "https://site.test"),
            sink,
            Locale::En,
        )
    }

    fn monitor(transport: Arc<dyn Transport>, interval: Duration) -> HealthMonitor {
        HealthMonitor::new(
            client_with(transport, Arc::new(MemorySink::new())),
            interval,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_fetch_once_logs_unhealthy_servers() {
        let mut body = snapshot(1);
        body["servers"].as_array_mut().unwrap().push(json!({
            "instance": {"id": "id-x", "instance_identifier": "sx", "assigned_url": "https://sx.test"},
            "healthInfo": null,
            "responseTime": 5000,
            "status": "unhealthy",
            "error": "timeout"
        }));
        body["summary"] = json!({
            "total_servers": 2,
            "healthy_servers": 1,
            "unhealthy_servers": 1,
            "overall_status": "partial_healthy"
        });

        let mut mock = MockTransport::new();
        mock.expect_send()
            .withf(|r| r.url == "https://balancer.test/health-status" && r.timeout.is_some())
            .returning(move |_| Ok(ApiResponse::json_body(200, &body)));

        let sink = Arc::new(MemorySink::new());
        let monitor = HealthMonitor::new(
            client_with(Arc::new(mock), sink.clone()),
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        let snapshot = monitor.fetch_once().await.unwrap();
        assert_eq!(snapshot.summary.unhealthy_servers, 1);

        let down: Vec<_> = sink
            .events_for("Health Status Check")
            .into_iter()
            .filter(|e| e.severity == Severity::Error)
            .collect();
        assert_eq!(down.len(), 1);
        assert!(down[0].message.contains("sx"));
        assert_eq!(down[0].fields["url"], "https://sx.test");
    }

    #[tokio::test]
    async fn test_fetch_once_classifies_failure() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Ok(ApiResponse::new(503, vec![])));

        let err = monitor(Arc::new(mock), Duration::from_secs(30))
            .fetch_once()
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_until_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockTransport::new();
        mock.expect_send().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse::json_body(200, &snapshot(2)))
        });

        let handle = monitor(Arc::new(mock), Duration::from_secs(30)).spawn();
        let mut rx = handle.subscribe();

        rx.wait_for(|v| v.completed >= 1).await.unwrap();
        let view = handle.current();
        assert_eq!(view.snapshot.unwrap().summary.total_servers, 2);
        assert!(view.last_update.is_some());

        let started = tokio::time::Instant::now();
        rx.wait_for(|v| v.completed >= 3).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(60));

        handle.shutdown().await;
        let before = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockTransport::new();
        mock.expect_send().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ApiResponse::json_body(200, &snapshot(1)))
            } else {
                Ok(ApiResponse::new(503, vec![]))
            }
        });

        let handle = monitor(Arc::new(mock), Duration::from_secs(3600)).spawn();
        let mut rx = handle.subscribe();
        rx.wait_for(|v| v.completed >= 1).await.unwrap();
        assert!(handle.current().error.is_none());

        handle.refresh().await.unwrap();
        let view = handle.current();
        assert_eq!(view.completed, 2);
        assert_eq!(view.error.unwrap().category, ErrorCategory::Unavailable);
        assert!(view.snapshot.is_some());
        assert_eq!(view.in_flight, 0);
    }

    /// First request answers slowly with one server, later ones answer at once with two
    struct SlowFirstTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for SlowFirstTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, ApiFailure> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(ApiResponse::json_body(200, &snapshot(1)))
            } else {
                Ok(ApiResponse::json_body(200, &snapshot(2)))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_resolved_fetch_wins() {
        let transport = Arc::new(SlowFirstTransport {
            calls: AtomicUsize::new(0),
        });
        let handle = monitor(transport, Duration::from_secs(3600)).spawn();
        let mut rx = handle.subscribe();

        rx.wait_for(|v| v.in_flight == 1).await.unwrap();
        handle.refresh().await.unwrap();

        let view = handle.current();
        assert_eq!(view.completed, 1);
        assert!(view.is_loading());
        assert_eq!(view.snapshot.unwrap().summary.total_servers, 2);

        rx.wait_for(|v| v.completed == 2).await.unwrap();
        let view = handle.current();
        assert!(!view.is_loading());
        assert_eq!(view.snapshot.unwrap().summary.total_servers, 1);
    }

    #[tokio::test]
    async fn test_drop_cancels_polling() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Ok(ApiResponse::json_body(200, &snapshot(0))));

        let handle = monitor(Arc::new(mock), Duration::from_secs(30)).spawn();
        let token = handle.cancellation_token();
        assert!(handle.is_running());

        drop(handle);
        assert!(token.is_cancelled());
    }
}
