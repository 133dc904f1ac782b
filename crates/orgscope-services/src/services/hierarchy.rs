//! Mutation service for the organizational tree
//!
//! Every structural write runs its full validation sequence before touching
//! the store, under the shared mutation lock: parent existence, type
//! ordering, cycle guard, code uniqueness, and the deletion guards. The
//! first failing check aborts the operation with no partial write.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use orgscope_core::hierarchy::validate_type_order;
use orgscope_core::models::{
    CreateUnitRequest, OrgUnit, Page, UnitChanges, UnitFilter, UpdateUnitRequest,
};
use orgscope_core::OrgError;
use orgscope_db::{MembershipStore, UnitStore};

use super::MutationLock;

pub struct HierarchyService {
    units: Arc<dyn UnitStore>,
    memberships: Arc<dyn MembershipStore>,
    mutation_lock: MutationLock,
}

impl HierarchyService {
    pub fn new(
        units: Arc<dyn UnitStore>,
        memberships: Arc<dyn MembershipStore>,
        mutation_lock: MutationLock,
    ) -> Self {
        Self {
            units,
            memberships,
            mutation_lock,
        }
    }

    /// Load a unit, failing with `NotFound` when absent.
    pub async fn get_unit(&self, id: Uuid) -> Result<OrgUnit, OrgError> {
        self.units
            .get(id)
            .await?
            .ok_or_else(|| OrgError::NotFound(format!("Unit {} not found", id)))
    }

    pub async fn get_unit_by_code(&self, code: &str) -> Result<OrgUnit, OrgError> {
        self.units
            .get_by_code(code)
            .await?
            .ok_or_else(|| OrgError::NotFound(format!("Unit with code '{}' not found", code)))
    }

    pub async fn list_units(
        &self,
        filter: &UnitFilter,
        page: Page,
    ) -> Result<(Vec<OrgUnit>, i64), OrgError> {
        self.units.list(filter, page).await
    }

    /// Create a unit. When a parent is given it must exist and be strictly
    /// coarser than the new unit's type; the code must be unused.
    pub async fn create_unit(&self, req: CreateUnitRequest) -> Result<OrgUnit, OrgError> {
        req.validate()?;
        let _guard = self.mutation_lock.lock().await;

        if let Some(parent_id) = req.parent_id {
            let parent = self.units.get(parent_id).await?.ok_or_else(|| {
                OrgError::NotFound(format!("Parent unit {} not found", parent_id))
            })?;
            validate_type_order(req.unit_type, parent.unit_type)?;
        }

        if self.units.get_by_code(&req.code).await?.is_some() {
            return Err(OrgError::DuplicateCode(req.code));
        }

        let now = Utc::now();
        let unit = OrgUnit {
            id: Uuid::new_v4(),
            code: req.code,
            name: req.name,
            unit_type: req.unit_type,
            parent_id: req.parent_id,
            head_user_id: None,
            max_staff: req.max_staff,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.units.insert(&unit).await?;

        tracing::info!(unit_id = %unit.id, code = %unit.code, unit_type = unit.unit_type.as_str(), "Created unit");
        Ok(unit)
    }

    /// Partial update. A code change re-checks uniqueness; a parent change
    /// runs the full re-parent validation (existence, cycle guard, type
    /// order). `max_staff` is tri-state: an explicit inner `None` clears the
    /// capacity bound back to unlimited.
    pub async fn update_unit(
        &self,
        id: Uuid,
        req: UpdateUnitRequest,
    ) -> Result<OrgUnit, OrgError> {
        req.validate()?;
        if let Some(Some(max_staff)) = req.max_staff {
            if max_staff < 1 {
                return Err(OrgError::InvalidInput(
                    "max_staff must be at least 1".to_string(),
                ));
            }
        }
        let _guard = self.mutation_lock.lock().await;

        let existing = self.get_unit(id).await?;

        if let Some(ref code) = req.code {
            if *code != existing.code {
                if let Some(other) = self.units.get_by_code(code).await? {
                    if other.id != id {
                        return Err(OrgError::DuplicateCode(code.clone()));
                    }
                }
            }
        }

        if let Some(Some(new_parent_id)) = req.parent_id {
            self.validate_reparent(&existing, new_parent_id).await?;
        }

        let changes = UnitChanges {
            code: req.code,
            name: req.name,
            parent_id: req.parent_id,
            max_staff: req.max_staff,
            is_active: req.is_active,
        };
        let updated = self.units.update(id, &changes).await?;

        tracing::info!(unit_id = %id, "Updated unit");
        Ok(updated)
    }

    /// Re-parent a unit. `None` promotes it to a root and skips the type
    /// and cycle checks; otherwise the new parent must exist, must not live
    /// inside the moved unit's subtree, and must be strictly coarser.
    pub async fn move_unit(
        &self,
        id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<OrgUnit, OrgError> {
        let _guard = self.mutation_lock.lock().await;

        let existing = self.get_unit(id).await?;

        if let Some(new_parent_id) = new_parent_id {
            self.validate_reparent(&existing, new_parent_id).await?;
        }

        let changes = UnitChanges {
            parent_id: Some(new_parent_id),
            ..Default::default()
        };
        let moved = self.units.update(id, &changes).await?;

        tracing::info!(unit_id = %id, new_parent_id = ?new_parent_id, "Moved unit");
        Ok(moved)
    }

    /// Delete a unit. Blocked while any child unit or any membership
    /// remains; both guards run before the delete is issued. The unit's
    /// permission grants are removed with it.
    pub async fn delete_unit(&self, id: Uuid) -> Result<(), OrgError> {
        let _guard = self.mutation_lock.lock().await;

        let unit = self.get_unit(id).await?;

        let child_count = self.units.count_children(id).await?;
        if child_count > 0 {
            return Err(OrgError::Conflict(format!(
                "Cannot delete unit '{}': it has {} child unit(s)",
                unit.code, child_count
            )));
        }

        let member_count = self.memberships.count_for_unit(id).await?;
        if member_count > 0 {
            return Err(OrgError::Conflict(format!(
                "Cannot delete unit '{}': it has {} membership(s)",
                unit.code, member_count
            )));
        }

        self.units.delete(id).await?;

        tracing::info!(unit_id = %id, code = %unit.code, "Deleted unit");
        Ok(())
    }

    /// Soft enable/disable. Inactive units keep their place in the tree but
    /// reject new membership assignments.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<OrgUnit, OrgError> {
        let _guard = self.mutation_lock.lock().await;

        self.get_unit(id).await?;
        let changes = UnitChanges {
            is_active: Some(is_active),
            ..Default::default()
        };
        let updated = self.units.update(id, &changes).await?;

        tracing::info!(unit_id = %id, is_active, "Changed unit active flag");
        Ok(updated)
    }

    /// Shared re-parent validation: new parent exists, is outside the moved
    /// unit's subtree, and is strictly coarser. Caller holds the mutation
    /// lock.
    async fn validate_reparent(
        &self,
        unit: &OrgUnit,
        new_parent_id: Uuid,
    ) -> Result<(), OrgError> {
        let parent = self.units.get(new_parent_id).await?.ok_or_else(|| {
            OrgError::NotFound(format!("Parent unit {} not found", new_parent_id))
        })?;

        if self.units.is_descendant(unit.id, new_parent_id).await? {
            return Err(OrgError::Cycle {
                unit_id: unit.id,
                new_parent_id,
            });
        }

        validate_type_order(unit.unit_type, parent.unit_type)
    }
}
