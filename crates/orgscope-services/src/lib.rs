//! Orgscope Services Layer
//!
//! This crate is the **business service layer** of the hierarchy engine and
//! the surface the (out-of-scope) HTTP layer calls into: validated tree
//! mutations, traversal queries, and membership/permission resolution over
//! any store backend.

pub mod services;

pub use services::{
    mutation_lock, HierarchyService, MembershipService, MutationLock, TraversalService,
};
