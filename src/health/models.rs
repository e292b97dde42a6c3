//! Health snapshot returned by the balancer's `/health-status` endpoint

use crate::utils::datetime::flexible;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthInfo {
    #[serde(default)]
    pub used_space: u64,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
}

/// A storage server registered with the balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub instance_identifier: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub assigned_url: String,
    #[serde(with = "flexible::option", default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "flexible::option", default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[serde(default)]
    pub used_space: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedInfo {
    pub id: String,
    pub identifier: String,
    pub url: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub server_identifier: String,
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub provider: String,
    #[serde(with = "flexible::option", default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_info: Option<EnhancedInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
}

/// Result of probing one server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub instance: Instance,
    #[serde(rename = "healthInfo", default)]
    pub health_info: Option<HealthInfo>,
    #[serde(rename = "responseTime", default)]
    pub response_time: u64,
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "errorDetails", default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
}

impl ServerStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    AllHealthy,
    AllUnhealthy,
    PartialHealthy,
}

impl OverallStatus {
    /// `AllHealthy` needs at least one server and no unhealthy ones; a fleet
    /// of zero servers counts as `AllUnhealthy`.
    pub fn from_counts(healthy: usize, unhealthy: usize) -> Self {
        if unhealthy == 0 && healthy > 0 {
            Self::AllHealthy
        } else if healthy == 0 {
            Self::AllUnhealthy
        } else {
            Self::PartialHealthy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AllHealthy => "All healthy",
            Self::AllUnhealthy => "All unhealthy",
            Self::PartialHealthy => "Partially healthy",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total_servers: usize,
    pub healthy_servers: usize,
    pub unhealthy_servers: usize,
    pub overall_status: OverallStatus,
}

impl HealthSummary {
    pub fn from_servers(servers: &[ServerStatus]) -> Self {
        let healthy = servers.iter().filter(|s| s.is_healthy()).count();
        let unhealthy = servers.len() - healthy;
        Self {
            total_servers: servers.len(),
            healthy_servers: healthy,
            unhealthy_servers: unhealthy,
            overall_status: OverallStatus::from_counts(healthy, unhealthy),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatusResponse {
    pub success: bool,
    #[serde(with = "flexible")]
    pub timestamp: DateTime<Utc>,
    pub summary: HealthSummary,
    #[serde(default)]
    pub servers: Vec<ServerStatus>,
}

impl HealthStatusResponse {
    /// Whether the reported summary agrees with the per-server entries
    pub fn summary_is_consistent(&self) -> bool {
        HealthSummary::from_servers(&self.servers) == self.summary
    }

    pub fn unhealthy(&self) -> impl Iterator<Item = &ServerStatus> {
        self.servers.iter().filter(|s| !s.is_healthy())
    }
}
