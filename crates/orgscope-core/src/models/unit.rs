use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Organizational unit type, ranked coarse-to-fine.
///
/// A unit can only hang under a strictly coarser parent: the variant order
/// here is the rank order, so `DIRECCION` roots the tree and `OFICINA` is
/// always a leaf type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "unit_type", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitType {
    Direccion,
    Coordinacion,
    Departamento,
    Unidad,
    Seccion,
    Oficina,
}

impl UnitType {
    /// Fixed ordinal rank, 1 (coarsest) to 6 (finest).
    pub fn rank(&self) -> u8 {
        match self {
            UnitType::Direccion => 1,
            UnitType::Coordinacion => 2,
            UnitType::Departamento => 3,
            UnitType::Unidad => 4,
            UnitType::Seccion => 5,
            UnitType::Oficina => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Direccion => "DIRECCION",
            UnitType::Coordinacion => "COORDINACION",
            UnitType::Departamento => "DEPARTAMENTO",
            UnitType::Unidad => "UNIDAD",
            UnitType::Seccion => "SECCION",
            UnitType::Oficina => "OFICINA",
        }
    }
}

/// Organizational unit entity - a node in the department tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrgUnit {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub unit_type: UnitType,
    pub parent_id: Option<Uuid>,
    pub head_user_id: Option<Uuid>,
    pub max_staff: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a new unit
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUnitRequest {
    #[validate(length(
        min = 1,
        max = 32,
        message = "Unit code must be between 1 and 32 characters"
    ))]
    pub code: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Unit name must be between 1 and 255 characters"
    ))]
    pub name: String,
    pub unit_type: UnitType,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 1, message = "max_staff must be at least 1"))]
    pub max_staff: Option<i32>,
}

/// Request DTO for updating a unit
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUnitRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 32,
        message = "Unit code must be between 1 and 32 characters"
    ))]
    pub code: Option<String>,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Unit name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    /// Option<Option> to distinguish between None (no change) and Some(None) (promote to root)
    #[serde(default)]
    pub parent_id: Option<Option<Uuid>>,
    /// Option<Option> like `parent_id`: `Some(None)` clears the cap back to
    /// unlimited
    #[serde(default)]
    pub max_staff: Option<Option<i32>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Store-level partial update. Applied blindly by the store; all business
/// validation happens in the services before one of these is built.
/// `head_user_id` is absent on purpose: the mirror is owned by the
/// membership store and only moves with membership writes.
#[derive(Debug, Clone, Default)]
pub struct UnitChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub max_staff: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

/// Filter for listing units
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitFilter {
    #[serde(default)]
    pub unit_type: Option<UnitType>,
    /// Option<Option> to distinguish "any parent" from "roots only" from "children of X"
    #[serde(default)]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Case-insensitive substring match over code and name
    #[serde(default)]
    pub search: Option<String>,
}

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 200;

/// Pagination window for list queries
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Clamp limit into [1, MAX_PAGE_LIMIT] and offset to >= 0.
    pub fn clamped(&self) -> Page {
        Page {
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_type_rank_is_total_and_strict() {
        let ordered = [
            UnitType::Direccion,
            UnitType::Coordinacion,
            UnitType::Departamento,
            UnitType::Unidad,
            UnitType::Seccion,
            UnitType::Oficina,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_unit_type_serde_screaming_names() {
        let json = serde_json::to_string(&UnitType::Departamento).unwrap();
        assert_eq!(json, "\"DEPARTAMENTO\"");
        let back: UnitType = serde_json::from_str("\"OFICINA\"").unwrap();
        assert_eq!(back, UnitType::Oficina);
    }

    #[test]
    fn test_page_clamping() {
        let page = Page {
            limit: 10_000,
            offset: -5,
        };
        let clamped = page.clamped();
        assert_eq!(clamped.limit, MAX_PAGE_LIMIT);
        assert_eq!(clamped.offset, 0);

        assert_eq!(Page::default().limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_update_request_parent_tristate() {
        // absent field -> no change
        let req: UpdateUnitRequest = serde_json::from_str("{}").unwrap();
        assert!(req.parent_id.is_none());

        // bare null collapses to no-change at the serde layer; promoting to
        // root goes through the move operation instead
        let req: UpdateUnitRequest = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert!(req.parent_id.is_none());

        // explicit id -> re-parent
        let id = Uuid::new_v4();
        let req: UpdateUnitRequest =
            serde_json::from_str(&format!(r#"{{"parent_id": "{}"}}"#, id)).unwrap();
        assert_eq!(req.parent_id, Some(Some(id)));

        // max_staff follows the same shape; an explicit value sets the cap
        let req: UpdateUnitRequest = serde_json::from_str(r#"{"max_staff": 5}"#).unwrap();
        assert_eq!(req.max_staff, Some(Some(5)));
    }
}
