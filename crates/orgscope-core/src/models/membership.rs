use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership role, ordered by seniority (HEAD first).
///
/// Only HEAD carries extra semantics: at most one per unit, mirrored onto
/// `OrgUnit::head_user_id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "membership_role", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipRole {
    Head,
    Supervisor,
    Coordinator,
    Member,
    Assistant,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Head => "HEAD",
            MembershipRole::Supervisor => "SUPERVISOR",
            MembershipRole::Coordinator => "COORDINATOR",
            MembershipRole::Member => "MEMBER",
            MembershipRole::Assistant => "ASSISTANT",
        }
    }
}

/// Assignment of a user to a unit.
///
/// Jointly referenced by user and unit, owned by neither: deleting a
/// membership never cascades into either side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Membership {
    pub user_id: Uuid,
    pub unit_id: Uuid,
    pub role: MembershipRole,
    pub is_primary: bool,
    pub assigned_at: DateTime<Utc>,
}

/// Minimal user record - just enough for the resolver's existence and
/// activity checks. The full user profile lives in the (out-of-scope)
/// HR module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
}

/// Request DTO for assigning a user to a unit
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentRequest {
    pub user_id: Uuid,
    pub role: MembershipRole,
    #[serde(default)]
    pub is_primary: bool,
}

/// Options for re-assigning during a transfer
#[derive(Debug, Clone, Deserialize)]
pub struct TransferOptions {
    pub role: MembershipRole,
    #[serde(default)]
    pub is_primary: bool,
}
