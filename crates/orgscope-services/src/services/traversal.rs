//! Traversal engine
//!
//! Read-only queries over the tree: ancestors (nearest-parent-first),
//! descendants (level-tagged, ordered by level then code), root-first paths,
//! and subtree statistics. Correct for arbitrarily deep trees; takes no
//! lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use orgscope_core::models::{DescendantEntry, HierarchyStats, OrgUnit};
use orgscope_core::OrgError;
use orgscope_db::{MembershipStore, UnitStore};

pub struct TraversalService {
    units: Arc<dyn UnitStore>,
    memberships: Arc<dyn MembershipStore>,
}

impl TraversalService {
    pub fn new(units: Arc<dyn UnitStore>, memberships: Arc<dyn MembershipStore>) -> Self {
        Self { units, memberships }
    }

    async fn require_unit(&self, id: Uuid) -> Result<OrgUnit, OrgError> {
        self.units
            .get(id)
            .await?
            .ok_or_else(|| OrgError::NotFound(format!("Unit {} not found", id)))
    }

    /// Parent chain of the unit, nearest parent first, ending at the root.
    /// Empty for a root unit.
    pub async fn ancestors(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError> {
        self.require_unit(id).await?;
        self.units.ancestor_chain(id).await
    }

    /// Full subtree below the unit, each entry tagged with its level
    /// (1 = direct child), ordered by level then code. Empty for a leaf.
    pub async fn descendants(&self, id: Uuid) -> Result<Vec<DescendantEntry>, OrgError> {
        self.require_unit(id).await?;

        let mut rows = self.units.descendants_with_level(id).await?;
        rows.sort_by(|a, b| (a.1, &a.0.code).cmp(&(b.1, &b.0.code)));

        Ok(rows
            .into_iter()
            .map(|(unit, level)| DescendantEntry { unit, level })
            .collect())
    }

    /// Root-first path from the top of the tree down to (and including) the
    /// unit itself.
    pub async fn path(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError> {
        let unit = self.require_unit(id).await?;

        let mut path = self.units.ancestor_chain(id).await?;
        path.reverse();
        path.push(unit);
        Ok(path)
    }

    /// Subtree statistics, derived entirely from the descendant list.
    /// Membership count covers the unit itself plus all descendants.
    pub async fn hierarchy_stats(&self, id: Uuid) -> Result<HierarchyStats, OrgError> {
        self.require_unit(id).await?;
        let descendants = self.descendants(id).await?;

        let max_depth = descendants.iter().map(|d| d.level).max().unwrap_or(0);
        let direct_children_count = descendants.iter().filter(|d| d.level == 1).count() as i64;

        let mut counts_by_type = BTreeMap::new();
        for entry in &descendants {
            *counts_by_type.entry(entry.unit.unit_type).or_insert(0) += 1;
        }

        let mut subtree_ids: Vec<Uuid> = descendants.iter().map(|d| d.unit.id).collect();
        subtree_ids.push(id);
        let total_memberships_in_subtree = self.memberships.count_for_units(&subtree_ids).await?;

        Ok(HierarchyStats {
            total_descendants: descendants.len() as i64,
            max_depth,
            total_memberships_in_subtree,
            counts_by_type,
            direct_children_count,
        })
    }
}
