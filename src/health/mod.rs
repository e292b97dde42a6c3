//! Balancer health monitoring
//!
//! This module provides the health snapshot models and the polling monitor
//! behind `vk health`.

pub mod models;
pub mod monitor;

pub use models::{
    ErrorDetails, HealthInfo, HealthStatusResponse, HealthSummary, Instance, OverallStatus,
    ProbeStatus, ServerStatus,
};
pub use monitor::{HealthMonitor, HealthView, MonitorHandle};
