//! Error handling for salesboard
//!
//! Defines the typed error kinds surfaced to users and establishes a unified
//! Result type using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error kinds for import, entry and storage operations.
///
/// Malformed rows and unparseable monetary values never surface here: rows with
/// a bad date are dropped and bad amounts are coerced to zero by the normalizer.
#[derive(Error, Debug)]
pub enum SalesError {
    #[error("role '{role}' is not allowed to {action}")]
    AuthorizationDenied { role: String, action: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("parse error: {0}")]
    ParseError(String),
}

/// Result type alias for salesboard operations
pub type Result<T> = anyhow::Result<T>;
