//! Data models for the hierarchy engine
//!
//! Organized by domain: units (the tree), memberships (user assignments),
//! permissions (direct grants), traversal (derived read shapes).

mod membership;
mod permission;
mod traversal;
mod unit;

// Re-export all models for convenient imports
pub use membership::*;
pub use permission::*;
pub use traversal::*;
pub use unit::*;
