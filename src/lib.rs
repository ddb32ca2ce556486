// Core infrastructure modules
pub mod core;

// SQL synthesis and execution layers
pub mod builder;
pub mod helper;
pub mod schema;
pub mod value;

// Re-export the types most callers need
pub use crate::core::{Result, SqlitekitError};
pub use crate::helper::{ResultSet, SqliteHelper};
pub use crate::value::Value;
