//! Business services for the hierarchy engine
//!
//! `hierarchy` is the mutation service (validated structural writes),
//! `traversal` the read-only traversal engine, `membership` the membership
//! and permission resolver. Structural and membership mutations share one
//! lock so a cycle check can never race a concurrent re-parent; traversal
//! reads never take it.

pub mod hierarchy;
pub mod membership;
pub mod traversal;

use std::sync::Arc;

use tokio::sync::Mutex;

/// Serializes every mutation across validate-then-write. Shared between the
/// hierarchy and membership services.
pub type MutationLock = Arc<Mutex<()>>;

/// A fresh mutation lock for wiring up a service pair.
pub fn mutation_lock() -> MutationLock {
    Arc::new(Mutex::new(()))
}

pub use hierarchy::HierarchyService;
pub use membership::MembershipService;
pub use traversal::TraversalService;
