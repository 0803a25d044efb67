use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codes the directory is known to send. Anything else decodes as `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    RateLimited,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Error body returned by the profile directory on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A failed directory lookup. The message is what the settings panel shows inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ApiError> for LookupError {
    fn from(value: ApiError) -> Self {
        Self {
            message: value.message,
        }
    }
}
