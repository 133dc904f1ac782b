use orgscope_core::models::User;
use orgscope_core::OrgError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::UserStore;

/// Read-only Postgres view over the user directory. The HR module owns the
/// table; the engine only checks existence and activity.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<User>, OrgError> {
        let user = sqlx::query_as::<Postgres, User>(
            "SELECT id, email, name, is_active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
