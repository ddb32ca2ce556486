/// sqlitekit Error Module
///
/// This module defines the error types used throughout the crate. Internal
/// layers propagate these with `?`; the public `SqliteHelper` facade converts
/// them into its bool + last-error contract at the boundary.
use thiserror::Error;

/// Error type covering every failure mode of the crate:
/// - Driver errors surfaced verbatim from rusqlite
/// - Schema validation failures (missing table or field)
/// - Statement synthesis and binding problems
/// - Transaction control failures
/// - Connection lifecycle problems (closed handle, duplicate name)
#[derive(Error, Debug)]
pub enum SqlitekitError {
    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema validation errors (table or field not found in the catalog)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Statement synthesis and parameter binding errors
    #[error("Query error: {0}")]
    Query(String),

    /// Transaction-related errors
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Connection lifecycle errors
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Type alias for Result to use SqlitekitError as the error type.
pub type Result<T> = std::result::Result<T, SqlitekitError>;
