//! Balancer API access
//!
//! This module holds the HTTP transport seam, the failure taxonomy and its
//! classification into user-facing categories, and the structured
//! diagnostics every call reports through.

pub mod classify;
pub mod client;
pub mod diagnostics;
pub mod failure;
pub mod transport;

pub use classify::{classify, Classification, ClassifyContext, ErrorCategory, FailedServer};
pub use client::BalancerClient;
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, MemorySink, OperationLog, Severity, TracingSink};
pub use failure::ApiFailure;
pub use transport::{ApiRequest, ApiResponse, FormPart, HttpTransport, Method, RequestBody, Transport};
