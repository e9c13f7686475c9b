// src/error.rs

//! Unified error handling for the enrichment application.

use std::fmt;

use thiserror::Error;

/// Result type alias for enrichment operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Unexpected HTTP status from a remote service
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Spreadsheet backend error
    #[error("Sheet error: {0}")]
    Sheet(String),

    /// Link handler failure
    #[error("Handler error for {context}: {message}")]
    Handler { context: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create an HTTP status error.
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a spreadsheet backend error.
    pub fn sheet(message: impl Into<String>) -> Self {
        Self::Sheet(message.into())
    }

    /// Create a handler error with context.
    pub fn handler(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Handler {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        assert!(AppError::status(503, "https://a.com").is_transient());
        assert!(AppError::status(429, "https://a.com").is_transient());
        assert!(!AppError::status(404, "https://a.com").is_transient());
        assert!(!AppError::validation("bad").is_transient());
    }

    #[test]
    fn test_display() {
        let err = AppError::handler("github", "rate limited");
        assert_eq!(err.to_string(), "Handler error for github: rate limited");
    }
}
