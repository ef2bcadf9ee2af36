//! Type Conversions for RagError
//!
//! From trait implementations for converting common error types into
//! RagError.

use super::types::RagError;

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::TimeoutError(err.to_string());
        }
        if err.is_connect() {
            return Self::ConnectionError(err.to_string());
        }
        if err.is_decode() {
            return Self::JsonError(err.to_string());
        }
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}
