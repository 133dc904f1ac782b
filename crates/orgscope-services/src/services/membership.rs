//! Membership & permission resolver
//!
//! Manages user-unit assignments (role + primary flag) and resolves
//! effective permissions by aggregating grants across all of a user's
//! memberships. Grants never travel up or down the tree: two users inside
//! the same subtree can have entirely different effective sets.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use orgscope_core::models::{
    AssignmentRequest, GrantRequest, Membership, MembershipRole, OrgUnit, PermissionAction,
    PermissionGrant, TransferOptions, User,
};
use orgscope_core::OrgError;
use orgscope_db::{GrantStore, MembershipStore, UnitStore, UserStore};

use super::MutationLock;

pub struct MembershipService {
    units: Arc<dyn UnitStore>,
    users: Arc<dyn UserStore>,
    memberships: Arc<dyn MembershipStore>,
    grants: Arc<dyn GrantStore>,
    mutation_lock: MutationLock,
}

impl MembershipService {
    pub fn new(
        units: Arc<dyn UnitStore>,
        users: Arc<dyn UserStore>,
        memberships: Arc<dyn MembershipStore>,
        grants: Arc<dyn GrantStore>,
        mutation_lock: MutationLock,
    ) -> Self {
        Self {
            units,
            users,
            memberships,
            grants,
            mutation_lock,
        }
    }

    /// Assign a user to a unit. Validation order: unit exists and is
    /// active, user exists and is active, capacity, duplicate assignment,
    /// HEAD uniqueness. The store write atomically demotes the user's other
    /// primaries for a primary assignment and mirrors a HEAD assignment
    /// onto `head_user_id`.
    pub async fn assign(
        &self,
        unit_id: Uuid,
        req: AssignmentRequest,
    ) -> Result<Membership, OrgError> {
        let _guard = self.mutation_lock.lock().await;

        let unit = self.require_active_unit(unit_id).await?;
        self.require_active_user(req.user_id).await?;
        self.check_capacity(&unit).await?;
        self.check_not_assigned(unit_id, req.user_id).await?;
        self.check_head_free(unit_id, req.role).await?;

        let membership = Membership {
            user_id: req.user_id,
            unit_id,
            role: req.role,
            is_primary: req.is_primary,
            assigned_at: Utc::now(),
        };
        self.memberships.insert(&membership).await?;

        tracing::info!(unit_id = %unit_id, user_id = %req.user_id, role = req.role.as_str(), "Assigned user to unit");
        Ok(membership)
    }

    /// Remove a user's membership. Clears `head_user_id` when the removed
    /// membership was the HEAD.
    pub async fn remove(&self, unit_id: Uuid, user_id: Uuid) -> Result<(), OrgError> {
        let _guard = self.mutation_lock.lock().await;
        self.remove_locked(unit_id, user_id).await
    }

    /// Change a membership's role and optionally its primary flag. Re-runs
    /// the HEAD-uniqueness and primary-exclusivity checks; the store write
    /// maintains `head_user_id` across transitions in or out of HEAD.
    pub async fn change_role(
        &self,
        unit_id: Uuid,
        user_id: Uuid,
        new_role: MembershipRole,
        is_primary: Option<bool>,
    ) -> Result<Membership, OrgError> {
        let _guard = self.mutation_lock.lock().await;

        let existing = self.require_membership(unit_id, user_id).await?;

        if new_role == MembershipRole::Head && existing.role != MembershipRole::Head {
            self.check_head_free(unit_id, new_role).await?;
        }

        let is_primary = is_primary.unwrap_or(existing.is_primary);
        let updated = self
            .memberships
            .update(unit_id, user_id, new_role, is_primary)
            .await?;

        tracing::info!(unit_id = %unit_id, user_id = %user_id, role = new_role.as_str(), "Changed membership role");
        Ok(updated)
    }

    /// Move a user from one unit to another in a single serialized
    /// operation. Every check against the target runs before the source
    /// membership is touched, so a logical failure can never leave the user
    /// assigned to neither unit.
    pub async fn transfer(
        &self,
        from_unit_id: Uuid,
        to_unit_id: Uuid,
        user_id: Uuid,
        opts: TransferOptions,
    ) -> Result<Membership, OrgError> {
        let _guard = self.mutation_lock.lock().await;

        self.require_membership(from_unit_id, user_id).await?;

        let target = self.require_active_unit(to_unit_id).await?;
        self.require_active_user(user_id).await?;
        self.check_not_assigned(to_unit_id, user_id).await?;
        self.check_capacity(&target).await?;
        self.check_head_free(to_unit_id, opts.role).await?;

        self.remove_locked(from_unit_id, user_id).await?;

        let membership = Membership {
            user_id,
            unit_id: to_unit_id,
            role: opts.role,
            is_primary: opts.is_primary,
            assigned_at: Utc::now(),
        };
        self.memberships.insert(&membership).await?;

        tracing::info!(from_unit_id = %from_unit_id, to_unit_id = %to_unit_id, user_id = %user_id, "Transferred user");
        Ok(membership)
    }

    pub async fn memberships_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, OrgError> {
        self.memberships.list_for_user(user_id).await
    }

    pub async fn memberships_for_unit(&self, unit_id: Uuid) -> Result<Vec<Membership>, OrgError> {
        self.require_unit(unit_id).await?;
        self.memberships.list_for_unit(unit_id).await
    }

    /// The union of grants over exactly the units the user is a member of.
    /// No ancestor or descendant expansion.
    pub async fn effective_permissions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PermissionGrant>, OrgError> {
        let unit_ids: Vec<Uuid> = self
            .memberships
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|m| m.unit_id)
            .collect();
        self.grants.list_for_units(&unit_ids).await
    }

    /// True only when the user is a member of the unit AND a matching grant
    /// exists on that same unit.
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<bool, OrgError> {
        if self.memberships.get(unit_id, user_id).await?.is_none() {
            return Ok(false);
        }

        let grants = self.grants.list_for_unit(unit_id).await?;
        Ok(grants.iter().any(|g| g.matches(module, action, resource)))
    }

    /// True when a matching grant exists on any unit among the user's
    /// memberships.
    pub async fn has_permission_anywhere(
        &self,
        user_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<bool, OrgError> {
        let grants = self.effective_permissions(user_id).await?;
        Ok(grants.iter().any(|g| g.matches(module, action, resource)))
    }

    /// Attach a grant to a unit. The (unit, module, action, resource) tuple
    /// is unique.
    pub async fn grant(
        &self,
        unit_id: Uuid,
        req: GrantRequest,
    ) -> Result<PermissionGrant, OrgError> {
        req.validate()?;
        let _guard = self.mutation_lock.lock().await;

        self.require_unit(unit_id).await?;

        if self
            .grants
            .find(unit_id, &req.module, req.action, req.resource.as_deref())
            .await?
            .is_some()
        {
            return Err(OrgError::Conflict(format!(
                "Grant {}:{} already exists on unit {}",
                req.module,
                req.action.as_str(),
                unit_id
            )));
        }

        let grant = PermissionGrant {
            unit_id,
            module: req.module,
            action: req.action,
            resource: req.resource,
            granted_at: Utc::now(),
        };
        self.grants.insert(&grant).await?;

        tracing::info!(unit_id = %unit_id, module = %grant.module, action = grant.action.as_str(), "Granted permission");
        Ok(grant)
    }

    pub async fn revoke(
        &self,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<(), OrgError> {
        let _guard = self.mutation_lock.lock().await;

        let deleted = self.grants.delete(unit_id, module, action, resource).await?;
        if !deleted {
            return Err(OrgError::NotFound(format!(
                "Grant {}:{} not found on unit {}",
                module,
                action.as_str(),
                unit_id
            )));
        }

        tracing::info!(unit_id = %unit_id, module = %module, action = action.as_str(), "Revoked permission");
        Ok(())
    }

    pub async fn grants_for_unit(&self, unit_id: Uuid) -> Result<Vec<PermissionGrant>, OrgError> {
        self.require_unit(unit_id).await?;
        self.grants.list_for_unit(unit_id).await
    }

    // Validation helpers. All run under the mutation lock when called from
    // a mutating operation.

    async fn require_unit(&self, unit_id: Uuid) -> Result<OrgUnit, OrgError> {
        self.units
            .get(unit_id)
            .await?
            .ok_or_else(|| OrgError::NotFound(format!("Unit {} not found", unit_id)))
    }

    async fn require_active_unit(&self, unit_id: Uuid) -> Result<OrgUnit, OrgError> {
        let unit = self.require_unit(unit_id).await?;
        if !unit.is_active {
            return Err(OrgError::Conflict(format!(
                "Unit '{}' is inactive",
                unit.code
            )));
        }
        Ok(unit)
    }

    async fn require_active_user(&self, user_id: Uuid) -> Result<User, OrgError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| OrgError::NotFound(format!("User {} not found", user_id)))?;
        if !user.is_active {
            return Err(OrgError::Conflict(format!("User {} is inactive", user_id)));
        }
        Ok(user)
    }

    async fn require_membership(
        &self,
        unit_id: Uuid,
        user_id: Uuid,
    ) -> Result<Membership, OrgError> {
        self.memberships
            .get(unit_id, user_id)
            .await?
            .ok_or_else(|| {
                OrgError::NotFound(format!(
                    "Membership of user {} in unit {} not found",
                    user_id, unit_id
                ))
            })
    }

    async fn check_capacity(&self, unit: &OrgUnit) -> Result<(), OrgError> {
        if let Some(max_staff) = unit.max_staff {
            let current = self.memberships.count_for_unit(unit.id).await?;
            if current >= max_staff as i64 {
                return Err(OrgError::CapacityExceeded {
                    unit_id: unit.id,
                    current,
                    max_staff,
                });
            }
        }
        Ok(())
    }

    async fn check_not_assigned(&self, unit_id: Uuid, user_id: Uuid) -> Result<(), OrgError> {
        if self.memberships.get(unit_id, user_id).await?.is_some() {
            return Err(OrgError::DuplicateAssignment { user_id, unit_id });
        }
        Ok(())
    }

    async fn check_head_free(&self, unit_id: Uuid, role: MembershipRole) -> Result<(), OrgError> {
        if role == MembershipRole::Head && self.memberships.head_of(unit_id).await?.is_some() {
            return Err(OrgError::HeadConflict { unit_id });
        }
        Ok(())
    }

    async fn remove_locked(&self, unit_id: Uuid, user_id: Uuid) -> Result<(), OrgError> {
        self.require_membership(unit_id, user_id).await?;
        self.memberships.delete(unit_id, user_id).await?;

        tracing::info!(unit_id = %unit_id, user_id = %user_id, "Removed user from unit");
        Ok(())
    }
}
