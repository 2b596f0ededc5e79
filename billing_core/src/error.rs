//! Error types for the billing_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for billing_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Input validation error (empty field, unknown billing code)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record or catalog lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write to the table provider failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Malformed field in an input row
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
