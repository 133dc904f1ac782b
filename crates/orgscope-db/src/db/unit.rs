use orgscope_core::models::{OrgUnit, Page, UnitChanges, UnitFilter};
use orgscope_core::OrgError;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use super::store::UnitStore;

const UNIT_COLUMNS: &str =
    "id, code, name, unit_type, parent_id, head_user_id, max_staff, is_active, created_at, updated_at";

/// Postgres-backed unit store. Traversal reads use recursive CTEs so the
/// engine never assumes a maximum tree depth.
#[derive(Clone)]
pub struct UnitRepository {
    pool: PgPool,
}

#[derive(FromRow)]
struct DescendantRow {
    #[sqlx(flatten)]
    unit: OrgUnit,
    level: i32,
}

impl UnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UnitStore for UnitRepository {
    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<OrgUnit>, OrgError> {
        let unit = sqlx::query_as::<Postgres, OrgUnit>(&format!(
            "SELECT {} FROM org_units WHERE id = $1",
            UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(unit)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "select"))]
    async fn get_by_code(&self, code: &str) -> Result<Option<OrgUnit>, OrgError> {
        let unit = sqlx::query_as::<Postgres, OrgUnit>(&format!(
            "SELECT {} FROM org_units WHERE code = $1",
            UNIT_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(unit)
    }

    #[tracing::instrument(skip(self, filter), fields(db.table = "org_units", db.operation = "select"))]
    async fn list(
        &self,
        filter: &UnitFilter,
        page: Page,
    ) -> Result<(Vec<OrgUnit>, i64), OrgError> {
        let page = page.clamped();

        // Build the WHERE clause once and reuse it for both queries
        let mut clauses: Vec<String> = Vec::new();
        let mut bind_index = 1;

        if filter.unit_type.is_some() {
            clauses.push(format!("unit_type = ${}", bind_index));
            bind_index += 1;
        }
        match filter.parent_id {
            Some(Some(_)) => {
                clauses.push(format!("parent_id = ${}", bind_index));
                bind_index += 1;
            }
            Some(None) => clauses.push("parent_id IS NULL".to_string()),
            None => {}
        }
        if filter.is_active.is_some() {
            clauses.push(format!("is_active = ${}", bind_index));
            bind_index += 1;
        }
        if filter.search.is_some() {
            clauses.push(format!(
                "(code ILIKE '%' || ${} || '%' OR name ILIKE '%' || ${} || '%')",
                bind_index, bind_index
            ));
            bind_index += 1;
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let list_sql = format!(
            "SELECT {} FROM org_units{} ORDER BY code ASC LIMIT ${} OFFSET ${}",
            UNIT_COLUMNS,
            where_sql,
            bind_index,
            bind_index + 1
        );
        let count_sql = format!("SELECT COUNT(*) FROM org_units{}", where_sql);

        let mut list_query = sqlx::query_as::<Postgres, OrgUnit>(&list_sql);
        let mut count_query = sqlx::query_scalar::<Postgres, i64>(&count_sql);

        if let Some(unit_type) = filter.unit_type {
            list_query = list_query.bind(unit_type);
            count_query = count_query.bind(unit_type);
        }
        if let Some(Some(parent_id)) = filter.parent_id {
            list_query = list_query.bind(parent_id);
            count_query = count_query.bind(parent_id);
        }
        if let Some(is_active) = filter.is_active {
            list_query = list_query.bind(is_active);
            count_query = count_query.bind(is_active);
        }
        if let Some(ref search) = filter.search {
            list_query = list_query.bind(search.clone());
            count_query = count_query.bind(search.clone());
        }

        let units = list_query
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        let total = count_query.fetch_one(&self.pool).await?;

        Ok((units, total))
    }

    #[tracing::instrument(skip(self, unit), fields(db.table = "org_units", db.operation = "insert", db.record_id = %unit.id))]
    async fn insert(&self, unit: &OrgUnit) -> Result<(), OrgError> {
        sqlx::query(
            r#"
            INSERT INTO org_units (id, code, name, unit_type, parent_id, head_user_id, max_staff, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(unit.id)
        .bind(&unit.code)
        .bind(&unit.name)
        .bind(unit.unit_type)
        .bind(unit.parent_id)
        .bind(unit.head_user_id)
        .bind(unit.max_staff)
        .bind(unit.is_active)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, changes), fields(db.table = "org_units", db.operation = "update", db.record_id = %id))]
    async fn update(&self, id: Uuid, changes: &UnitChanges) -> Result<OrgUnit, OrgError> {
        let mut query = String::from("UPDATE org_units SET updated_at = NOW()");
        let mut bind_index = 1;

        if changes.code.is_some() {
            query.push_str(&format!(", code = ${}", bind_index));
            bind_index += 1;
        }
        if changes.name.is_some() {
            query.push_str(&format!(", name = ${}", bind_index));
            bind_index += 1;
        }
        if changes.parent_id.is_some() {
            query.push_str(&format!(", parent_id = ${}", bind_index));
            bind_index += 1;
        }
        if changes.max_staff.is_some() {
            query.push_str(&format!(", max_staff = ${}", bind_index));
            bind_index += 1;
        }
        if changes.is_active.is_some() {
            query.push_str(&format!(", is_active = ${}", bind_index));
            bind_index += 1;
        }

        query.push_str(&format!(
            " WHERE id = ${} RETURNING {}",
            bind_index, UNIT_COLUMNS
        ));

        let mut query_builder = sqlx::query_as::<Postgres, OrgUnit>(&query);
        if let Some(ref code) = changes.code {
            query_builder = query_builder.bind(code.clone());
        }
        if let Some(ref name) = changes.name {
            query_builder = query_builder.bind(name.clone());
        }
        if let Some(parent_id) = changes.parent_id {
            query_builder = query_builder.bind(parent_id);
        }
        if let Some(max_staff) = changes.max_staff {
            query_builder = query_builder.bind(max_staff);
        }
        if let Some(is_active) = changes.is_active {
            query_builder = query_builder.bind(is_active);
        }
        query_builder = query_builder.bind(id);

        let unit = query_builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| OrgError::NotFound(format!("Unit {} not found", id)))?;

        Ok(unit)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, OrgError> {
        let rows_affected = sqlx::query("DELETE FROM org_units WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "select"))]
    async fn children_of(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError> {
        let units = sqlx::query_as::<Postgres, OrgUnit>(&format!(
            "SELECT {} FROM org_units WHERE parent_id = $1 ORDER BY code ASC",
            UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "select"))]
    async fn count_children(&self, id: Uuid) -> Result<i64, OrgError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM org_units WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "select"))]
    async fn ancestor_chain(&self, id: Uuid) -> Result<Vec<OrgUnit>, OrgError> {
        // Walk child->parent edges to the root; level 1 = immediate parent
        let rows = sqlx::query_as::<Postgres, DescendantRow>(&format!(
            r#"
            WITH RECURSIVE chain AS (
                SELECT u.*, 1 AS level
                FROM org_units u
                WHERE u.id = (SELECT parent_id FROM org_units WHERE id = $1)
                UNION ALL
                SELECT u.*, c.level + 1
                FROM org_units u
                INNER JOIN chain c ON u.id = c.parent_id
            )
            SELECT {} , level FROM chain ORDER BY level ASC
            "#,
            UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.unit).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "select"))]
    async fn descendants_with_level(&self, id: Uuid) -> Result<Vec<(OrgUnit, i32)>, OrgError> {
        let rows = sqlx::query_as::<Postgres, DescendantRow>(&format!(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT u.*, 1 AS level
                FROM org_units u
                WHERE u.parent_id = $1
                UNION ALL
                SELECT u.*, s.level + 1
                FROM org_units u
                INNER JOIN subtree s ON u.parent_id = s.id
            )
            SELECT {} , level FROM subtree ORDER BY level ASC, code ASC
            "#,
            UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| (row.unit, row.level)).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "org_units", db.operation = "select"))]
    async fn is_descendant(&self, ancestor_id: Uuid, node_id: Uuid) -> Result<bool, OrgError> {
        if ancestor_id == node_id {
            return Ok(true);
        }

        let is_desc: bool = sqlx::query_scalar(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id, parent_id
                FROM org_units
                WHERE id = $1
                UNION ALL
                SELECT u.id, u.parent_id
                FROM org_units u
                INNER JOIN subtree s ON u.parent_id = s.id
            )
            SELECT EXISTS(SELECT 1 FROM subtree WHERE id = $2)
            "#,
        )
        .bind(ancestor_id)
        .bind(node_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(is_desc)
    }
}
