//! In-memory store backend
//!
//! Adjacency-map implementation of the store traits. Backs the test suites
//! and embedded callers that do not want a database; behavior matches the
//! Postgres repositories, including atomic primary demotion and the
//! `head_user_id` mirror on membership writes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use orgscope_core::models::{
    Membership, MembershipRole, OrgUnit, Page, PermissionAction, PermissionGrant, UnitChanges,
    UnitFilter, User,
};
use orgscope_core::OrgError;

use super::store::{GrantStore, MembershipStore, UnitStore, UserStore};

#[derive(Default)]
struct MemoryInner {
    units: HashMap<Uuid, OrgUnit>,
    // keyed by (unit_id, user_id), matching the table's composite key
    memberships: HashMap<(Uuid, Uuid), Membership>,
    grants: Vec<PermissionGrant>,
    users: HashMap<Uuid, User>,
}

/// In-memory backend implementing all four store traits.
#[derive(Clone, Default)]
pub struct MemoryOrgStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryOrgStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record (the user directory is otherwise owned by the HR
    /// module).
    pub fn add_user(&self, user: User) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.users.insert(user.id, user);
    }
}

impl MemoryInner {
    fn children_sorted(&self, id: Uuid) -> Vec<OrgUnit> {
        let mut children: Vec<OrgUnit> = self
            .units
            .values()
            .filter(|u| u.parent_id == Some(id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.code.cmp(&b.code));
        children
    }
}

#[async_trait]
impl UnitStore for MemoryOrgStore {
    async fn get(&self, id: Uuid) -> Result<Option<OrgUnit>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.units.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<OrgUnit>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.units.values().find(|u| u.code == code).cloned())
    }

    async fn list(
        &self,
        filter: &UnitFilter,
        page: Page,
    ) -> Result<(Vec<OrgUnit>, i64), OrgError> {
        let page = page.clamped();
        let inner = self.inner.read().expect("store lock poisoned");

        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut matches: Vec<OrgUnit> = inner
            .units
            .values()
            .filter(|u| {
                if let Some(unit_type) = filter.unit_type {
                    if u.unit_type != unit_type {
                        return false;
                    }
                }
                match filter.parent_id {
                    Some(Some(parent_id)) if u.parent_id != Some(parent_id) => return false,
                    Some(None) if u.parent_id.is_some() => return false,
                    _ => {}
                }
                if let Some(is_active) = filter.is_active {
                    if u.is_active != is_active {
                        return false;
                    }
                }
                if let Some(ref needle) = needle {
                    if !u.code.to_lowercase().contains(needle)
                        && !u.name.to_lowercase().contains(needle)
                    {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.code.cmp(&b.code));

        let total = matches.len() as i64;
        let units = matches
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();

        Ok((units, total))
    }

    async fn insert(&self, unit: &OrgUnit) -> Result<(), OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn update(&self, id: Uuid, changes: &UnitChanges) -> Result<OrgUnit, OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let unit = inner
            .units
            .get_mut(&id)
            .ok_or_else(|| OrgError::NotFound(format!("Unit {} not found", id)))?;

        if let Some(ref code) = changes.code {
            unit.code = code.clone();
        }
        if let Some(ref name) = changes.name {
            unit.name = name.clone();
        }
        if let Some(parent_id) = changes.parent_id {
            unit.parent_id = parent_id;
        }
        if let Some(max_staff) = changes.max_staff {
            unit.max_staff = max_staff;
        }
        if let Some(is_active) = changes.is_active {
            unit.is_active = is_active;
        }
        unit.updated_at = Utc::now();

        Ok(unit.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let removed = inner.units.remove(&id).is_some();
        if removed {
            // grants die with their unit, like the FK cascade on Postgres
            inner.grants.retain(|g| g.unit_id != id);
        }
        Ok(removed)
    }

    async fn children_of(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.children_sorted(id))
    }

    async fn count_children(&self, id: Uuid) -> Result<i64, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .units
            .values()
            .filter(|u| u.parent_id == Some(id))
            .count() as i64)
    }

    async fn ancestor_chain(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);

        let mut current = inner.units.get(&id).and_then(|u| u.parent_id);
        while let Some(parent_id) = current {
            // visited guard keeps the walk terminating even on corrupt data
            if !visited.insert(parent_id) {
                break;
            }
            match inner.units.get(&parent_id) {
                Some(parent) => {
                    chain.push(parent.clone());
                    current = parent.parent_id;
                }
                None => break,
            }
        }

        Ok(chain)
    }

    async fn descendants_with_level(&self, id: Uuid) -> Result<Vec<(OrgUnit, i32)>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut result = Vec::new();
        let mut queue: VecDeque<(Uuid, i32)> = VecDeque::from([(id, 0)]);
        let mut visited = HashSet::from([id]);

        while let Some((current, level)) = queue.pop_front() {
            for child in inner.children_sorted(current) {
                if !visited.insert(child.id) {
                    continue;
                }
                queue.push_back((child.id, level + 1));
                result.push((child, level + 1));
            }
        }

        Ok(result)
    }

    async fn is_descendant(&self, ancestor_id: Uuid, node_id: Uuid) -> Result<bool, OrgError> {
        if ancestor_id == node_id {
            return Ok(true);
        }

        let inner = self.inner.read().expect("store lock poisoned");
        let mut visited = HashSet::from([node_id]);
        let mut current = inner.units.get(&node_id).and_then(|u| u.parent_id);

        while let Some(parent_id) = current {
            if parent_id == ancestor_id {
                return Ok(true);
            }
            if !visited.insert(parent_id) {
                break;
            }
            current = inner.units.get(&parent_id).and_then(|u| u.parent_id);
        }

        Ok(false)
    }
}

#[async_trait]
impl MembershipStore for MemoryOrgStore {
    async fn get(&self, unit_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.memberships.get(&(unit_id, user_id)).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut memberships: Vec<Membership> = inner
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| m.assigned_at);
        Ok(memberships)
    }

    async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<Membership>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut memberships: Vec<Membership> = inner
            .memberships
            .values()
            .filter(|m| m.unit_id == unit_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| (m.role, m.assigned_at));
        Ok(memberships)
    }

    async fn count_for_unit(&self, unit_id: Uuid) -> Result<i64, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .memberships
            .values()
            .filter(|m| m.unit_id == unit_id)
            .count() as i64)
    }

    async fn count_for_units(&self, unit_ids: &[Uuid]) -> Result<i64, OrgError> {
        let ids: HashSet<Uuid> = unit_ids.iter().copied().collect();
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .memberships
            .values()
            .filter(|m| ids.contains(&m.unit_id))
            .count() as i64)
    }

    async fn head_of(&self, unit_id: Uuid) -> Result<Option<Membership>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .memberships
            .values()
            .find(|m| m.unit_id == unit_id && m.role == MembershipRole::Head)
            .cloned())
    }

    async fn insert(&self, membership: &Membership) -> Result<(), OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if membership.is_primary {
            for m in inner.memberships.values_mut() {
                if m.user_id == membership.user_id {
                    m.is_primary = false;
                }
            }
        }
        inner
            .memberships
            .insert((membership.unit_id, membership.user_id), membership.clone());

        if membership.role == MembershipRole::Head {
            if let Some(unit) = inner.units.get_mut(&membership.unit_id) {
                unit.head_user_id = Some(membership.user_id);
            }
        }
        Ok(())
    }

    async fn delete(&self, unit_id: Uuid, user_id: Uuid) -> Result<bool, OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let removed = inner.memberships.remove(&(unit_id, user_id)).is_some();
        if removed {
            if let Some(unit) = inner.units.get_mut(&unit_id) {
                if unit.head_user_id == Some(user_id) {
                    unit.head_user_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn update(
        &self,
        unit_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
        is_primary: bool,
    ) -> Result<Membership, OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if !inner.memberships.contains_key(&(unit_id, user_id)) {
            return Err(OrgError::NotFound(format!(
                "Membership of user {} in unit {} not found",
                user_id, unit_id
            )));
        }

        if is_primary {
            for m in inner.memberships.values_mut() {
                if m.user_id == user_id && m.unit_id != unit_id {
                    m.is_primary = false;
                }
            }
        }

        let membership = inner
            .memberships
            .get_mut(&(unit_id, user_id))
            .expect("membership checked above");
        membership.role = role;
        membership.is_primary = is_primary;
        let updated = membership.clone();

        if let Some(unit) = inner.units.get_mut(&unit_id) {
            if role == MembershipRole::Head {
                unit.head_user_id = Some(user_id);
            } else if unit.head_user_id == Some(user_id) {
                unit.head_user_id = None;
            }
        }

        Ok(updated)
    }
}

#[async_trait]
impl GrantStore for MemoryOrgStore {
    async fn find(
        &self,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<Option<PermissionGrant>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .grants
            .iter()
            .find(|g| {
                g.unit_id == unit_id
                    && g.module == module
                    && g.action == action
                    && g.resource.as_deref() == resource
            })
            .cloned())
    }

    async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<PermissionGrant>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut grants: Vec<PermissionGrant> = inner
            .grants
            .iter()
            .filter(|g| g.unit_id == unit_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| {
            (&a.module, a.action, &a.resource).cmp(&(&b.module, b.action, &b.resource))
        });
        Ok(grants)
    }

    async fn list_for_units(&self, unit_ids: &[Uuid]) -> Result<Vec<PermissionGrant>, OrgError> {
        let ids: HashSet<Uuid> = unit_ids.iter().copied().collect();
        let inner = self.inner.read().expect("store lock poisoned");
        let mut grants: Vec<PermissionGrant> = inner
            .grants
            .iter()
            .filter(|g| ids.contains(&g.unit_id))
            .cloned()
            .collect();
        grants.sort_by(|a, b| {
            (&a.module, a.action, &a.resource).cmp(&(&b.module, b.action, &b.resource))
        });
        Ok(grants)
    }

    async fn insert(&self, grant: &PermissionGrant) -> Result<(), OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.grants.push(grant.clone());
        Ok(())
    }

    async fn delete(
        &self,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<bool, OrgError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let before = inner.grants.len();
        inner.grants.retain(|g| {
            !(g.unit_id == unit_id
                && g.module == module
                && g.action == action
                && g.resource.as_deref() == resource)
        });
        Ok(inner.grants.len() < before)
    }
}

#[async_trait]
impl UserStore for MemoryOrgStore {
    async fn get(&self, id: Uuid) -> Result<Option<User>, OrgError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.users.get(&id).cloned())
    }
}
