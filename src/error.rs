//! Custom error types for rustcoauthors.
//!
//! This module defines all error types used throughout the collector.
//! Library functions return `Result<T, CollectError>` instead of panicking.

use thiserror::Error;

/// Main error type for rustcoauthors operations.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Network/HTTP transport error (connection reset, timeout, ...)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream payload did not match the expected schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed endpoint URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `CollectError`
pub type Result<T> = std::result::Result<T, CollectError>;
