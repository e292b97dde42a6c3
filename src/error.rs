use crate::api::classify::ErrorCategory;
use thiserror::Error;

/// Main error type for vaultkrate operations
#[derive(Debug, Error)]
pub enum VaultKrateError {
    #[error("{message}")]
    Api {
        category: ErrorCategory,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Not signed in. Run 'vk login' first")]
    NotSignedIn,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Configuration loading error: {0}")]
    ConfigLoadError(#[from] config::ConfigError),

    #[error("Prompt error: {0}")]
    PromptError(#[from] dialoguer::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl VaultKrateError {
    pub fn api<S: Into<String>>(category: ErrorCategory, message: S) -> Self {
        Self::Api {
            category,
            message: message.into(),
        }
    }

    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unknown<S: Into<String>>(msg: S) -> Self {
        Self::Unknown(msg.into())
    }

    /// Category of a classified backend failure, if this error carries one
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Api { category, .. } => Some(*category),
            _ => None,
        }
    }
}

impl From<arboard::Error> for VaultKrateError {
    fn from(error: arboard::Error) -> Self {
        Self::ClipboardError(error.to_string())
    }
}

/// Result type alias for vaultkrate operations
pub type Result<T> = std::result::Result<T, VaultKrateError>;
