//! Failure values produced by balancer calls, before classification

use thiserror::Error;

/// Why a balancer call did not succeed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiFailure {
    /// The request never produced a response
    #[error("{}", network_message(.message, .timeout))]
    Network { message: String, timeout: bool },
    /// The balancer answered with a non-success status
    #[error("HTTP {status}")]
    Http { status: u16, body: Vec<u8> },
    /// Anything else, e.g. an undecodable payload
    #[error("{message}")]
    Unknown { message: String },
}

fn network_message(message: &str, timeout: &bool) -> String {
    if *timeout {
        format!("request timed out: {}", message)
    } else {
        format!("network failure: {}", message)
    }
}

impl ApiFailure {
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            timeout: true,
        }
    }

    pub fn http(status: u16, body: Vec<u8>) -> Self {
        Self::Http { status, body }
    }

    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::timeout(error.to_string());
        }

        if error.is_decode() || error.is_builder() {
            return Self::unknown(error.to_string());
        }

        Self::network(error.to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body as text, for diagnostics
    pub fn body_text(&self) -> Option<String> {
        match self {
            Self::Http { body, .. } if !body.is_empty() => {
                Some(String::from_utf8_lossy(body).into_owned())
            }
            _ => None,
        }
    }
}
