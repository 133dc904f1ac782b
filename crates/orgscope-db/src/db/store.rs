//! Store traits - the Node Store seam
//!
//! These traits are the durable-record contract: plain reads and writes with
//! no business validation. The services perform every hierarchy/membership
//! check before calling a write, so a store implementation must apply writes
//! blindly. Two backends ship with the engine: Postgres repositories and an
//! in-memory adjacency map.

use async_trait::async_trait;
use uuid::Uuid;

use orgscope_core::models::{
    Membership, MembershipRole, OrgUnit, Page, PermissionAction, PermissionGrant, UnitChanges,
    UnitFilter, User,
};
use orgscope_core::OrgError;

/// Durable record of organizational units and the parent relation.
///
/// The raw traversal reads (`ancestor_chain`, `descendants_with_level`,
/// `is_descendant`) are store-level because each backend has a natural way
/// to answer them (recursive CTE vs. pointer walk); the Traversal Engine
/// shapes their output into the public contracts.
#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<OrgUnit>, OrgError>;

    async fn get_by_code(&self, code: &str) -> Result<Option<OrgUnit>, OrgError>;

    /// Returns the requested page plus the total count matching the filter.
    async fn list(&self, filter: &UnitFilter, page: Page)
        -> Result<(Vec<OrgUnit>, i64), OrgError>;

    async fn insert(&self, unit: &OrgUnit) -> Result<(), OrgError>;

    /// Applies the partial update and returns the stored row.
    /// Fails with `NotFound` if the unit does not exist.
    async fn update(&self, id: Uuid, changes: &UnitChanges) -> Result<OrgUnit, OrgError>;

    /// Returns false when the unit did not exist. Deleting a unit also
    /// removes its permission grants.
    async fn delete(&self, id: Uuid) -> Result<bool, OrgError>;

    /// Direct children, ordered by code.
    async fn children_of(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError>;

    async fn count_children(&self, id: Uuid) -> Result<i64, OrgError>;

    /// Parent chain starting at the node's immediate parent, nearest first.
    /// The caller is responsible for checking that the node itself exists.
    async fn ancestor_chain(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError>;

    /// Full subtree below the node, each unit tagged with its level
    /// (1 = direct child). Ordering is backend-defined; the Traversal
    /// Engine sorts into the public (level, code) contract.
    async fn descendants_with_level(&self, id: Uuid) -> Result<Vec<(OrgUnit, i32)>, OrgError>;

    /// Whether `node_id` lies in the subtree rooted at `ancestor_id`
    /// (true for `node_id == ancestor_id`). This is the cycle guard.
    async fn is_descendant(&self, ancestor_id: Uuid, node_id: Uuid) -> Result<bool, OrgError>;
}

/// Durable record of user-unit assignments.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn get(&self, unit_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, OrgError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, OrgError>;

    async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<Membership>, OrgError>;

    async fn count_for_unit(&self, unit_id: Uuid) -> Result<i64, OrgError>;

    /// Total memberships across the given units (subtree statistics).
    async fn count_for_units(&self, unit_ids: &[Uuid]) -> Result<i64, OrgError>;

    /// The unit's HEAD membership, if any.
    async fn head_of(&self, unit_id: Uuid) -> Result<Option<Membership>, OrgError>;

    /// Insert a membership. When `membership.is_primary` is set, every other
    /// primary membership of the same user is demoted, and a HEAD insert
    /// sets the unit's `head_user_id`; both happen in the same atomic write.
    async fn insert(&self, membership: &Membership) -> Result<(), OrgError>;

    /// Returns false when no such membership existed. Clears the unit's
    /// `head_user_id` when it pointed at the removed user.
    async fn delete(&self, unit_id: Uuid, user_id: Uuid) -> Result<bool, OrgError>;

    /// Update role and primary flag; demotes other primaries atomically when
    /// `is_primary` is set, and maintains the unit's `head_user_id` across
    /// transitions in or out of HEAD. Fails with `NotFound` if the
    /// membership is absent.
    async fn update(
        &self,
        unit_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
        is_primary: bool,
    ) -> Result<Membership, OrgError>;
}

/// Durable record of per-unit permission grants.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn find(
        &self,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<Option<PermissionGrant>, OrgError>;

    async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<PermissionGrant>, OrgError>;

    async fn list_for_units(&self, unit_ids: &[Uuid]) -> Result<Vec<PermissionGrant>, OrgError>;

    async fn insert(&self, grant: &PermissionGrant) -> Result<(), OrgError>;

    /// Returns false when no such grant existed.
    async fn delete(
        &self,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<bool, OrgError>;
}

/// Read-only view of the user directory owned by the HR module.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<User>, OrgError>;
}
