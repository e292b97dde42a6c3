//! Classification of failed balancer calls
//!
//! Every failure maps to exactly one [`ErrorCategory`] and one localized,
//! user-facing message. Callers use the category to decide follow-up state
//! (e.g. showing the "not found" view); nothing here retries.

use crate::api::failure::ApiFailure;
use crate::config::Locale;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    #[serde(rename = "network")]
    Network,
    #[serde(rename = "validation")]
    Validation,
    #[serde(rename = "auth")]
    Auth,
    #[serde(rename = "permission")]
    Permission,
    #[serde(rename = "forbidden")]
    Forbidden,
    #[serde(rename = "notfound")]
    NotFound,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "filesize")]
    FileSize,
    #[serde(rename = "server")]
    Server,
    #[serde(rename = "backend")]
    Backend,
    #[serde(rename = "backend_failure")]
    BackendFailure,
    #[serde(rename = "unavailable")]
    Unavailable,
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "generic")]
    Generic,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Forbidden => "forbidden",
            Self::NotFound => "notfound",
            Self::Expired => "expired",
            Self::FileSize => "filesize",
            Self::Server => "server",
            Self::Backend => "backend",
            Self::BackendFailure => "backend_failure",
            Self::Unavailable => "unavailable",
            Self::Unknown => "unknown",
            Self::Generic => "generic",
        }
    }

    /// Whether the file can no longer be fetched (disables download actions)
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound | Self::Expired | Self::Forbidden)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the failed call was made from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifyContext {
    #[default]
    General,
    /// Calls addressing a single shared file (file-detail view, download)
    File,
}

/// Backend replica reported by the balancer when it could not reach it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailedServer {
    #[serde(default)]
    pub server_identifier: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub failed_at: Option<String>,
}

impl FailedServer {
    pub fn display_name(&self) -> &str {
        self.server_identifier
            .as_deref()
            .or(self.server_id.as_deref())
            .unwrap_or("unknown")
    }
}

/// Structured body the balancer sends with a 502 when a replica failed
#[derive(Debug, Clone, Deserialize)]
struct BackendFailureBody {
    #[serde(default)]
    failed_server: serde_json::Value,
    #[serde(default)]
    message: Option<String>,
}

impl BackendFailureBody {
    fn failed_server(&self) -> Option<FailedServer> {
        match &self.failed_server {
            serde_json::Value::Object(_) => {
                serde_json::from_value(self.failed_server.clone()).ok()
            }
            serde_json::Value::String(name) if !name.is_empty() => Some(FailedServer {
                server_identifier: Some(name.clone()),
                ..Default::default()
            }),
            _ => None,
        }
    }
}

/// Outcome of classifying one failure
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: ErrorCategory,
    /// Localized message shown to the user
    pub message: String,
    /// Operator-facing summary, never shown to the user
    pub detail: String,
    pub failed_server: Option<FailedServer>,
}

/// Map a failure to its category and message
pub fn classify(failure: &ApiFailure, context: ClassifyContext, locale: Locale) -> Classification {
    match failure {
        ApiFailure::Network { .. } => simple(
            ErrorCategory::Network,
            locale,
            context,
            "Network connectivity error",
        ),
        ApiFailure::Http { status, body } => classify_http(*status, body, context, locale),
        ApiFailure::Unknown { message } => Classification {
            category: ErrorCategory::Generic,
            message: user_message(ErrorCategory::Generic, context, locale),
            detail: message.clone(),
            failed_server: None,
        },
    }
}

fn classify_http(
    status: u16,
    body: &[u8],
    context: ClassifyContext,
    locale: Locale,
) -> Classification {
    if status == 502 {
        if let Ok(parsed) = serde_json::from_slice::<BackendFailureBody>(body) {
            if let Some(server) = parsed.failed_server() {
                let extra = parsed.message.unwrap_or_default();
                let message = match locale {
                    Locale::En => format!(
                        "Backend server \"{}\" is unavailable. {}",
                        server.display_name(),
                        extra
                    ),
                    Locale::Es => format!(
                        "Servidor backend \"{}\" no disponible. {}",
                        server.display_name(),
                        extra
                    ),
                };
                return Classification {
                    category: ErrorCategory::BackendFailure,
                    message: message.trim_end().to_string(),
                    detail: format!("Backend server {} failed", server.display_name()),
                    failed_server: Some(server),
                };
            }
        }
    }

    let (category, detail) = match status {
        400 => (ErrorCategory::Validation, "Invalid request data".to_string()),
        401 => (ErrorCategory::Auth, "Authentication required".to_string()),
        403 => match context {
            ClassifyContext::General => (ErrorCategory::Permission, "Access denied".to_string()),
            ClassifyContext::File => (ErrorCategory::Forbidden, "File access forbidden".to_string()),
        },
        404 => (ErrorCategory::NotFound, "Resource not found".to_string()),
        410 if context == ClassifyContext::File => {
            (ErrorCategory::Expired, "File has expired".to_string())
        }
        413 => (ErrorCategory::FileSize, "File too large".to_string()),
        500 => (ErrorCategory::Server, "Internal server error".to_string()),
        502 => (ErrorCategory::Backend, "Backend server unavailable".to_string()),
        503 => (ErrorCategory::Unavailable, "Service unavailable".to_string()),
        other => (ErrorCategory::Unknown, format!("HTTP {}", other)),
    };

    let message = if category == ErrorCategory::Unknown {
        match locale {
            Locale::En => format!("Server error: {}", status),
            Locale::Es => format!("Error del servidor: {}", status),
        }
    } else {
        user_message(category, context, locale)
    };

    Classification {
        category,
        message,
        detail,
        failed_server: None,
    }
}

fn simple(
    category: ErrorCategory,
    locale: Locale,
    context: ClassifyContext,
    detail: &str,
) -> Classification {
    Classification {
        category,
        message: user_message(category, context, locale),
        detail: detail.to_string(),
        failed_server: None,
    }
}

/// Fixed notification text for a category
pub fn user_message(category: ErrorCategory, context: ClassifyContext, locale: Locale) -> String {
    let text = match (locale, category) {
        (Locale::En, ErrorCategory::Network) => "Connection error. Check your internet connection.",
        (Locale::Es, ErrorCategory::Network) => "Error de conexión. Verifica tu conexión a internet.",
        (Locale::En, ErrorCategory::Validation) => "Invalid data. Check the information you sent.",
        (Locale::Es, ErrorCategory::Validation) => "Datos inválidos. Verifica la información enviada.",
        (Locale::En, ErrorCategory::Auth) => "Session expired. Please sign in again.",
        (Locale::Es, ErrorCategory::Auth) => "Sesión expirada. Por favor inicia sesión nuevamente.",
        (Locale::En, ErrorCategory::Permission) => {
            "Access denied. You don't have permission for this action."
        }
        (Locale::Es, ErrorCategory::Permission) => {
            "Acceso denegado. No tienes permisos para esta acción."
        }
        (Locale::En, ErrorCategory::Forbidden) => "You don't have access to this file.",
        (Locale::Es, ErrorCategory::Forbidden) => "No tienes acceso a este archivo.",
        (Locale::En, ErrorCategory::NotFound) => match context {
            ClassifyContext::File => "File not found or it has expired.",
            ClassifyContext::General => "Resource not found.",
        },
        (Locale::Es, ErrorCategory::NotFound) => match context {
            ClassifyContext::File => "Archivo no encontrado o ha expirado.",
            ClassifyContext::General => "Recurso no encontrado.",
        },
        (Locale::En, ErrorCategory::Expired) => "This file has expired.",
        (Locale::Es, ErrorCategory::Expired) => "Este archivo ha expirado.",
        (Locale::En, ErrorCategory::FileSize) => "File too large. Reduce its size and try again.",
        (Locale::Es, ErrorCategory::FileSize) => {
            "Archivo demasiado grande. Reduce el tamaño e intenta nuevamente."
        }
        (Locale::En, ErrorCategory::Server) => "Internal server error. Try again later.",
        (Locale::Es, ErrorCategory::Server) => {
            "Error interno del servidor. Intenta nuevamente más tarde."
        }
        (Locale::En, ErrorCategory::Backend) => "Backend server unavailable. Try again later.",
        (Locale::Es, ErrorCategory::Backend) => "Servidor backend no disponible. Intenta más tarde.",
        (Locale::En, ErrorCategory::BackendFailure) => "A backend server is unavailable.",
        (Locale::Es, ErrorCategory::BackendFailure) => "Un servidor backend no está disponible.",
        (Locale::En, ErrorCategory::Unavailable) => {
            "Service temporarily unavailable. Try again later."
        }
        (Locale::Es, ErrorCategory::Unavailable) => {
            "Servicio no disponible temporalmente. Intenta más tarde."
        }
        (Locale::En, ErrorCategory::Unknown) => "Unexpected server response.",
        (Locale::Es, ErrorCategory::Unknown) => "Respuesta inesperada del servidor.",
        (Locale::En, ErrorCategory::Generic) => "Unexpected error. Please try again.",
        (Locale::Es, ErrorCategory::Generic) => "Error inesperado. Por favor intenta nuevamente.",
    };
    text.to_string()
}
