//! Common error types for FUZE

use thiserror::Error;

/// Common result type for FUZE operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the FUZE crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport error talking to the hosted backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Hosted backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the record store could not be reached or rejected the query.
    ///
    /// Callers map these to a generic 500 and keep the detail in the logs.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Http(_) | Error::Backend { .. }
        )
    }
}
