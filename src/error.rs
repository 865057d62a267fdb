//! Error types for Colloquy
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Colloquy operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, provider interactions, persistence, and
/// request validation.
#[derive(Error, Debug)]
pub enum ColloquyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation errors (empty/missing required content)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider-related errors (API calls, malformed streams, timeouts)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Authentication errors (e.g., 401 Unauthorized from the provider)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Message translation errors (malformed model-facing payloads)
    #[error("Translation error: {0}")]
    Translation(String),

    /// Remote call errors (server-side action reported failure)
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Colloquy operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
