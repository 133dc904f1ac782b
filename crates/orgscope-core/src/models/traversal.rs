use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::unit::{OrgUnit, UnitType};

/// A descendant unit tagged with its depth below the queried node
/// (level 1 = direct child).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescendantEntry {
    #[serde(flatten)]
    pub unit: OrgUnit,
    pub level: i32,
}

/// Aggregate statistics for the subtree rooted at a unit, derived entirely
/// from its descendant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyStats {
    pub total_descendants: i64,
    /// Maximum descendant level observed; 0 when the unit has no children.
    pub max_depth: i32,
    /// Memberships over the unit itself plus all descendants.
    pub total_memberships_in_subtree: i64,
    pub counts_by_type: BTreeMap<UnitType, i64>,
    pub direct_children_count: i64,
}
