//! Core error types.

use thiserror::Error;

/// Coarse classification used by callers to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The turn failed on the wire (status, connect, read, timeout).
    Transport,
    /// A payload could not be decoded at a crate boundary.
    Decode,
    /// The API was used incorrectly (turn already running, double attach).
    Usage,
    /// Client configuration is invalid.
    Configuration,
}

#[derive(Debug, Clone, Error)]
pub enum RagError {
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("A turn is already in flight for conversation {0}")]
    TurnInFlight(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl RagError {
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_)
            | Self::ApiError { .. }
            | Self::ConnectionError(_)
            | Self::TimeoutError(_)
            | Self::StreamError(_) => ErrorCategory::Transport,
            Self::ParseError(_) | Self::JsonError(_) => ErrorCategory::Decode,
            Self::TurnInFlight(_) | Self::InvalidInput(_) => ErrorCategory::Usage,
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
        }
    }

    /// True for failures that end a turn and should be shown to the user.
    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    /// HTTP status code, when the error came from a non-2xx response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }
}
