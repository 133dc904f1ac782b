use orgscope_core::models::{PermissionAction, PermissionGrant};
use orgscope_core::OrgError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::GrantStore;

const GRANT_COLUMNS: &str = "unit_id, module, action, resource, granted_at";

/// Postgres-backed grant store. Grants attach to exactly one unit; there is
/// no tree expansion at this layer or above it.
#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GrantStore for PermissionRepository {
    #[tracing::instrument(skip(self), fields(db.table = "org_permission_grants", db.operation = "select"))]
    async fn find(
        &self,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<Option<PermissionGrant>, OrgError> {
        let grant = sqlx::query_as::<Postgres, PermissionGrant>(&format!(
            r#"
            SELECT {} FROM org_permission_grants
            WHERE unit_id = $1 AND module = $2 AND action = $3
              AND resource IS NOT DISTINCT FROM $4
            "#,
            GRANT_COLUMNS
        ))
        .bind(unit_id)
        .bind(module)
        .bind(action)
        .bind(resource)
        .fetch_optional(&self.pool)
        .await?;

        Ok(grant)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_permission_grants", db.operation = "select"))]
    async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<PermissionGrant>, OrgError> {
        let grants = sqlx::query_as::<Postgres, PermissionGrant>(&format!(
            "SELECT {} FROM org_permission_grants WHERE unit_id = $1 ORDER BY module, action, resource",
            GRANT_COLUMNS
        ))
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    #[tracing::instrument(skip(self, unit_ids), fields(db.table = "org_permission_grants", db.operation = "select"))]
    async fn list_for_units(&self, unit_ids: &[Uuid]) -> Result<Vec<PermissionGrant>, OrgError> {
        if unit_ids.is_empty() {
            return Ok(Vec::new());
        }

        let grants = sqlx::query_as::<Postgres, PermissionGrant>(&format!(
            "SELECT {} FROM org_permission_grants WHERE unit_id = ANY($1) ORDER BY module, action, resource",
            GRANT_COLUMNS
        ))
        .bind(unit_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    #[tracing::instrument(skip(self, grant), fields(db.table = "org_permission_grants", db.operation = "insert"))]
    async fn insert(&self, grant: &PermissionGrant) -> Result<(), OrgError> {
        sqlx::query(
            r#"
            INSERT INTO org_permission_grants (unit_id, module, action, resource, granted_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(grant.unit_id)
        .bind(&grant.module)
        .bind(grant.action)
        .bind(&grant.resource)
        .bind(grant.granted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_permission_grants", db.operation = "delete"))]
    async fn delete(
        &self,
        unit_id: Uuid,
        module: &str,
        action: PermissionAction,
        resource: Option<&str>,
    ) -> Result<bool, OrgError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM org_permission_grants
            WHERE unit_id = $1 AND module = $2 AND action = $3
              AND resource IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(unit_id)
        .bind(module)
        .bind(action)
        .bind(resource)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}
