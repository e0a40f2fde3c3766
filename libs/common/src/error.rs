//! Custom error types for the common library
//!
//! This module defines error types shared by the services: storage failures
//! and token failures.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised while issuing or validating access tokens
#[derive(Error, Debug)]
pub enum TokenError {
    /// Key material could not be loaded
    #[error("Token key error: {0}")]
    Key(String),

    /// The service only holds a verifying key
    #[error("Token signing is not configured")]
    SigningDisabled,

    /// Signature, format or expiry check failed
    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// Clock went backwards
    #[error("System time error")]
    Clock,
}

/// Returns true when the error chain carries a PostgreSQL unique violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<SqlxError>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}
