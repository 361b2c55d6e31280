//! Refresh error types.

use std::time::Duration;

use thiserror::Error;
use xrate_common::CurrencyCode;

/// Why a refresh did not replace the current snapshot.
///
/// Always recoverable: the resolver keeps serving the previous snapshot.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    /// Request could not be sent or the body could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote source answered with a non-success status.
    #[error("Rate source returned HTTP {0}")]
    Status(u16),

    /// Body was not the expected JSON shape.
    #[error("Malformed rate payload: {0}")]
    Malformed(String),

    /// No usable rates survived validation.
    #[error("Rate payload contained no usable rates")]
    EmptyTable,

    /// The base currency could not be resolved from the payload.
    #[error("Base currency {0} missing from rate payload")]
    MissingBase(CurrencyCode),

    /// The refresh did not complete in time.
    #[error("Refresh timed out after {0:?}")]
    Timeout(Duration),
}

impl RefreshError {
    /// Whether retrying the same request later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RefreshError::Transport(_) | RefreshError::Timeout(_) => true,
            RefreshError::Status(code) => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Stable identifier for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            RefreshError::Transport(_) => "TRANSPORT",
            RefreshError::Status(_) => "BAD_STATUS",
            RefreshError::Malformed(_) => "MALFORMED_PAYLOAD",
            RefreshError::EmptyTable => "EMPTY_TABLE",
            RefreshError::MissingBase(_) => "MISSING_BASE",
            RefreshError::Timeout(_) => "TIMEOUT",
        }
    }
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RefreshError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            RefreshError::Status(status.as_u16())
        } else {
            RefreshError::Transport(err.to_string())
        }
    }
}

/// Result type for refresh operations.
pub type RefreshResult<T> = Result<T, RefreshError>;
