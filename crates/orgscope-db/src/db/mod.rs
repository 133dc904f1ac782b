//! Storage backends for the hierarchy engine
//!
//! `store` defines the Node Store traits (no business validation); `unit`,
//! `membership`, `permission`, and `user` are the Postgres repositories;
//! `memory` is the adjacency-map backend used by tests and embedded callers.

pub mod store;
//
// Postgres repositories
pub mod membership;
pub mod permission;
pub mod unit;
pub mod user;
//
// In-memory backend
pub mod memory;
//
// Transaction utilities
pub mod transaction;

pub use membership::MembershipRepository;
pub use memory::MemoryOrgStore;
pub use permission::PermissionRepository;
pub use store::{GrantStore, MembershipStore, UnitStore, UserStore};
pub use unit::UnitRepository;
pub use user::UserRepository;
