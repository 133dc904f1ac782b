use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// CRUD action covered by a grant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "permission_action", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
}

impl PermissionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionAction::Create => "create",
            PermissionAction::Read => "read",
            PermissionAction::Update => "update",
            PermissionAction::Delete => "delete",
        }
    }
}

/// Permission grant attached directly to one unit.
///
/// Grants are never inherited up or down the tree; a user's effective set
/// is the union of grants over the units they are directly assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PermissionGrant {
    pub unit_id: Uuid,
    pub module: String,
    pub action: PermissionAction,
    /// Optional qualifier. A grant without a resource is module/action-wide.
    pub resource: Option<String>,
    pub granted_at: DateTime<Utc>,
}

impl PermissionGrant {
    /// Whether this grant satisfies a permission check for the given
    /// module/action/resource. A resource-less grant matches any requested
    /// resource; a resourced grant matches only that exact resource.
    pub fn matches(
        &self,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> bool {
        if self.module != module || self.action != action {
            return false;
        }
        match (&self.resource, resource) {
            (None, _) => true,
            (Some(granted), Some(requested)) => granted == requested,
            (Some(_), None) => false,
        }
    }
}

/// Request DTO for granting a permission to a unit
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GrantRequest {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Module name must be between 1 and 64 characters"
    ))]
    pub module: String,
    pub action: PermissionAction,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 128,
        message = "Resource qualifier must be between 1 and 128 characters"
    ))]
    pub resource: Option<String>,
}
