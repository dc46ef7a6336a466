//! Common error types for clobaudit
//!
//! Rows whose documents fail validation are not errors. They are collected in
//! a [`ConformanceReport`](crate::ConformanceReport). Everything here aborts
//! the run.

use thiserror::Error;

/// Common result type for clobaudit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors raised while preparing or running an audit
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A change-set failed to apply or no longer matches its recorded checksum
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Changelog file unreadable or malformed
    #[error("Changelog error: {0}")]
    Changelog(String),

    /// Schema document unreadable, not JSON, or not a valid JSON Schema
    #[error("Schema error: {0}")]
    Schema(String),
}

/// Coarse classification used when reporting why a run aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, configuration, changelog, schema or query failure
    Infrastructure,
    /// A change-set could not be applied
    Migration,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Migration(_) => ErrorCategory::Migration,
            Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Changelog(_)
            | Error::Schema(_) => ErrorCategory::Infrastructure,
        }
    }
}
