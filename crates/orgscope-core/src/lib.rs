//! Orgscope Core Library
//!
//! Domain models, error types, configuration, and the pure hierarchy rules
//! shared across the engine's crates.

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod models;

// Re-export commonly used types
pub use config::DatabaseConfig;
pub use error::{ErrorMetadata, LogLevel, OrgError};
pub use hierarchy::validate_type_order;
