//! Structured failures from the remote session service.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error codes from the service's error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    StateError,
    WalletLimitExceeded,
    RateLimit,
    InternalError,
    Unauthorized,
    /// A code this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// Parse a code string, mapping anything unrecognised to [`ErrorCode::Unknown`].
    pub fn parse(code: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(code.to_string()))
            .unwrap_or(ErrorCode::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::StateError => "STATE_ERROR",
            ErrorCode::WalletLimitExceeded => "WALLET_LIMIT_EXCEEDED",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body returned by the service: `{ "error": { "code", "message", "details"? } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Any failure of a remote call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with a structured error.
    #[error("service rejected request ({code}): {message}")]
    Api {
        code: ErrorCode,
        status: Option<u16>,
        message: String,
    },

    /// The request never produced a usable response (connect, timeout, reset).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response arrived but could not be decoded.
    #[error("malformed service response: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn api(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            status: None,
            message: message.into(),
        }
    }

    /// The machine-readable code carried by this failure, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
