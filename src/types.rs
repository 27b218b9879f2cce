//! Crate-wide error type and result alias.

use thiserror::Error;

/// Errors raised by showroom infrastructure
#[derive(Debug, Error)]
pub enum ShowroomError {
    /// Configuration problem (missing or invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// MongoDB failure
    #[error("Database error: {0}")]
    Database(String),

    /// Authentication or authorization failure
    #[error("Auth error: {0}")]
    Auth(String),

    /// HTTP request handling failure (bad body, oversized payload)
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O failure (listener bind, usage log)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShowroomError>;
