//! Structured diagnostics for balancer calls
//!
//! Network-call wrappers report through a [`DiagnosticSink`] instead of
//! writing to the log directly, so classification stays independent of
//! where operator output ends up.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    pub operation: String,
    pub severity: Severity,
    pub message: String,
    pub request_id: Uuid,
    pub fields: BTreeMap<String, Value>,
}

pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: DiagnosticEvent) {
        let fields = if event.fields.is_empty() {
            String::new()
        } else {
            Value::Object(event.fields.into_iter().collect()).to_string()
        };

        match event.severity {
            Severity::Debug => tracing::debug!(
                operation = %event.operation,
                request_id = %event.request_id,
                context = %fields,
                "{}",
                event.message
            ),
            Severity::Info => tracing::info!(
                operation = %event.operation,
                request_id = %event.request_id,
                context = %fields,
                "{}",
                event.message
            ),
            Severity::Warn => tracing::warn!(
                operation = %event.operation,
                request_id = %event.request_id,
                context = %fields,
                "{}",
                event.message
            ),
            Severity::Error => tracing::error!(
                operation = %event.operation,
                request_id = %event.request_id,
                context = %fields,
                "{}",
                event.message
            ),
        }
    }
}

/// Keeps events in memory; useful for inspecting what a call reported
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn events_for(&self, operation: &str) -> Vec<DiagnosticEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.operation == operation)
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Diagnostics scope for one operation
///
/// All events emitted through the same scope share a request id, the
/// context fields and the operation name.
pub struct OperationLog<'a> {
    sink: &'a dyn DiagnosticSink,
    operation: String,
    request_id: Uuid,
    started: Instant,
    context: BTreeMap<String, Value>,
}

impl<'a> OperationLog<'a> {
    pub fn start<S: Into<String>>(sink: &'a dyn DiagnosticSink, operation: S) -> Self {
        Self {
            sink,
            operation: operation.into(),
            request_id: Uuid::new_v4(),
            started: Instant::now(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, context: BTreeMap<String, Value>) -> Self {
        self.context.extend(context);
        self
    }

    pub fn context_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn emit<S: Into<String>>(
        &self,
        severity: Severity,
        message: S,
        extra: BTreeMap<String, Value>,
    ) {
        let mut fields = self.context.clone();
        fields.extend(extra);
        self.sink.record(DiagnosticEvent {
            operation: self.operation.clone(),
            severity,
            message: message.into(),
            request_id: self.request_id,
            fields,
        });
    }

    pub fn debug<S: Into<String>>(&self, message: S) {
        self.emit(Severity::Debug, message, BTreeMap::new());
    }

    pub fn info<S: Into<String>>(&self, message: S) {
        self.emit(Severity::Info, message, BTreeMap::new());
    }

    pub fn warn<S: Into<String>>(&self, message: S) {
        self.emit(Severity::Warn, message, BTreeMap::new());
    }

    pub fn error<S: Into<String>>(&self, message: S, extra: BTreeMap<String, Value>) {
        self.emit(Severity::Error, message, extra);
    }
}

/// Build a context map from `key => value` pairs
#[macro_export]
macro_rules! diag_context {
    () => { ::std::collections::BTreeMap::<String, ::serde_json::Value>::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::<String, ::serde_json::Value>::new();
        $( map.insert($key.to_string(), ::serde_json::json!($value)); )+
        map
    }};
}
