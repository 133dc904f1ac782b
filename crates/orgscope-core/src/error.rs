//! Error types module
//!
//! All engine failures are unified under the `OrgError` enum. Validation
//! failures (hierarchy ordering, cycles, capacity, duplicate assignments)
//! are logical conflicts reported to the caller; nothing is retried
//! internally.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the
//! `sqlx` feature so the core crate can be consumed by backends that do not
//! link a database driver.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "CYCLE_DETECTED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum OrgError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate unit code: {0}")]
    DuplicateCode(String),

    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("Cycle detected: unit {unit_id} cannot be placed under {new_parent_id}")]
    Cycle {
        unit_id: Uuid,
        new_parent_id: Uuid,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("User {user_id} is already assigned to unit {unit_id}")]
    DuplicateAssignment { user_id: Uuid, unit_id: Uuid },

    #[error("Unit {unit_id} already has a head")]
    HeadConflict { unit_id: Uuid },

    #[error("Unit {unit_id} is at capacity: {current}/{max_staff} members")]
    CapacityExceeded {
        unit_id: Uuid,
        current: i64,
        max_staff: i32,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error with source")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for OrgError {
    fn from(err: SqlxError) -> Self {
        OrgError::Database(err)
    }
}

impl From<anyhow::Error> for OrgError {
    fn from(err: anyhow::Error) -> Self {
        OrgError::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<validator::ValidationErrors> for OrgError {
    fn from(err: validator::ValidationErrors) -> Self {
        OrgError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable,
/// suggested_action, log_level). Reduces duplication in the ErrorMetadata
/// impl; client_message stays per-variant for dynamic content.
fn org_error_static_metadata(
    err: &OrgError,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        OrgError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        OrgError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            LogLevel::Debug,
        ),
        OrgError::DuplicateCode(_) => (
            409,
            "DUPLICATE_CODE",
            false,
            Some("Choose a different unit code"),
            LogLevel::Debug,
        ),
        OrgError::InvalidHierarchy(_) => (
            422,
            "INVALID_HIERARCHY",
            false,
            Some("Check the type ordering of parent and child units"),
            LogLevel::Debug,
        ),
        OrgError::Cycle { .. } => (
            422,
            "CYCLE_DETECTED",
            false,
            Some("The new parent must not be inside the moved unit's subtree"),
            LogLevel::Debug,
        ),
        OrgError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Remove child units and memberships first"),
            LogLevel::Debug,
        ),
        OrgError::DuplicateAssignment { .. } => (
            409,
            "DUPLICATE_ASSIGNMENT",
            false,
            Some("The user is already a member of this unit"),
            LogLevel::Debug,
        ),
        OrgError::HeadConflict { .. } => (
            409,
            "HEAD_CONFLICT",
            false,
            Some("Remove the current head before assigning a new one"),
            LogLevel::Debug,
        ),
        OrgError::CapacityExceeded { .. } => (
            409,
            "CAPACITY_EXCEEDED",
            false,
            Some("Raise max_staff or remove a member first"),
            LogLevel::Warn,
        ),
        OrgError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            LogLevel::Debug,
        ),
        OrgError::Internal { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl OrgError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            OrgError::Database(_) => "Database",
            OrgError::NotFound(_) => "NotFound",
            OrgError::DuplicateCode(_) => "DuplicateCode",
            OrgError::InvalidHierarchy(_) => "InvalidHierarchy",
            OrgError::Cycle { .. } => "Cycle",
            OrgError::Conflict(_) => "Conflict",
            OrgError::DuplicateAssignment { .. } => "DuplicateAssignment",
            OrgError::HeadConflict { .. } => "HeadConflict",
            OrgError::CapacityExceeded { .. } => "CapacityExceeded",
            OrgError::InvalidInput(_) => "InvalidInput",
            OrgError::Internal { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for OrgError {
    fn http_status_code(&self) -> u16 {
        org_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        org_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        org_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        org_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        org_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            OrgError::Database(_) => "Failed to access database".to_string(),
            OrgError::NotFound(ref msg) => msg.clone(),
            OrgError::DuplicateCode(ref code) => {
                format!("A unit with code '{}' already exists", code)
            }
            OrgError::InvalidHierarchy(ref msg) => msg.clone(),
            OrgError::Cycle { .. } => {
                "The new parent is inside the subtree of the unit being moved".to_string()
            }
            OrgError::Conflict(ref msg) => msg.clone(),
            OrgError::DuplicateAssignment { .. } => {
                "The user is already assigned to this unit".to_string()
            }
            OrgError::HeadConflict { .. } => "This unit already has a head".to_string(),
            OrgError::CapacityExceeded {
                current, max_staff, ..
            } => {
                format!("Unit is at capacity: {}/{} members", current, max_staff)
            }
            OrgError::InvalidInput(ref msg) => msg.clone(),
            OrgError::Internal { .. } => "Internal server error".to_string(),
        }
    }
}
