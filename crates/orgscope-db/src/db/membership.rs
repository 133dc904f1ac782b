use orgscope_core::models::{Membership, MembershipRole};
use orgscope_core::OrgError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::MembershipStore;
use super::transaction::TransactionGuard;

const MEMBERSHIP_COLUMNS: &str = "user_id, unit_id, role, is_primary, assigned_at";

/// Postgres-backed membership store.
///
/// Primary-flag exclusivity and the `org_units.head_user_id` mirror are
/// cross-row side effects, so every write runs them and the membership
/// change in one transaction.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MembershipStore for MembershipRepository {
    #[tracing::instrument(skip(self), fields(db.table = "org_memberships", db.operation = "select"))]
    async fn get(&self, unit_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, OrgError> {
        let membership = sqlx::query_as::<Postgres, Membership>(&format!(
            "SELECT {} FROM org_memberships WHERE unit_id = $1 AND user_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(unit_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_memberships", db.operation = "select"))]
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, OrgError> {
        let memberships = sqlx::query_as::<Postgres, Membership>(&format!(
            "SELECT {} FROM org_memberships WHERE user_id = $1 ORDER BY assigned_at ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_memberships", db.operation = "select"))]
    async fn list_for_unit(&self, unit_id: Uuid) -> Result<Vec<Membership>, OrgError> {
        let memberships = sqlx::query_as::<Postgres, Membership>(&format!(
            "SELECT {} FROM org_memberships WHERE unit_id = $1 ORDER BY role ASC, assigned_at ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_memberships", db.operation = "select"))]
    async fn count_for_unit(&self, unit_id: Uuid) -> Result<i64, OrgError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM org_memberships WHERE unit_id = $1")
                .bind(unit_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self, unit_ids), fields(db.table = "org_memberships", db.operation = "select"))]
    async fn count_for_units(&self, unit_ids: &[Uuid]) -> Result<i64, OrgError> {
        if unit_ids.is_empty() {
            return Ok(0);
        }

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM org_memberships WHERE unit_id = ANY($1)")
                .bind(unit_ids)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_memberships", db.operation = "select"))]
    async fn head_of(&self, unit_id: Uuid) -> Result<Option<Membership>, OrgError> {
        let membership = sqlx::query_as::<Postgres, Membership>(&format!(
            "SELECT {} FROM org_memberships WHERE unit_id = $1 AND role = 'HEAD'",
            MEMBERSHIP_COLUMNS
        ))
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    #[tracing::instrument(skip(self, membership), fields(db.table = "org_memberships", db.operation = "insert"))]
    async fn insert(&self, membership: &Membership) -> Result<(), OrgError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        if membership.is_primary {
            sqlx::query("UPDATE org_memberships SET is_primary = FALSE WHERE user_id = $1")
                .bind(membership.user_id)
                .execute(&mut **tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO org_memberships (user_id, unit_id, role, is_primary, assigned_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(membership.user_id)
        .bind(membership.unit_id)
        .bind(membership.role)
        .bind(membership.is_primary)
        .bind(membership.assigned_at)
        .execute(&mut **tx)
        .await?;

        if membership.role == MembershipRole::Head {
            sqlx::query("UPDATE org_units SET head_user_id = $1, updated_at = NOW() WHERE id = $2")
                .bind(membership.user_id)
                .bind(membership.unit_id)
                .execute(&mut **tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_memberships", db.operation = "delete"))]
    async fn delete(&self, unit_id: Uuid, user_id: Uuid) -> Result<bool, OrgError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let rows_affected =
            sqlx::query("DELETE FROM org_memberships WHERE unit_id = $1 AND user_id = $2")
                .bind(unit_id)
                .bind(user_id)
                .execute(&mut **tx)
                .await?
                .rows_affected();

        if rows_affected > 0 {
            sqlx::query(
                "UPDATE org_units SET head_user_id = NULL, updated_at = NOW() WHERE id = $1 AND head_user_id = $2",
            )
            .bind(unit_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }

        tx.commit().await?;
        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_memberships", db.operation = "update"))]
    async fn update(
        &self,
        unit_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
        is_primary: bool,
    ) -> Result<Membership, OrgError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        if is_primary {
            sqlx::query(
                "UPDATE org_memberships SET is_primary = FALSE WHERE user_id = $1 AND unit_id != $2",
            )
            .bind(user_id)
            .bind(unit_id)
            .execute(&mut **tx)
            .await?;
        }

        let membership = sqlx::query_as::<Postgres, Membership>(&format!(
            r#"
            UPDATE org_memberships SET role = $1, is_primary = $2
            WHERE unit_id = $3 AND user_id = $4
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(role)
        .bind(is_primary)
        .bind(unit_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            OrgError::NotFound(format!(
                "Membership of user {} in unit {} not found",
                user_id, unit_id
            ))
        })?;

        if role == MembershipRole::Head {
            sqlx::query("UPDATE org_units SET head_user_id = $1, updated_at = NOW() WHERE id = $2")
                .bind(user_id)
                .bind(unit_id)
                .execute(&mut **tx)
                .await?;
        } else {
            sqlx::query(
                "UPDATE org_units SET head_user_id = NULL, updated_at = NOW() WHERE id = $1 AND head_user_id = $2",
            )
            .bind(unit_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }

        tx.commit().await?;
        Ok(membership)
    }
}
