/// Core Module for sqlitekit
///
/// Shared infrastructure used by every layer of the crate: the error type
/// and the crate-wide `Result` alias.

pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, SqlitekitError};
