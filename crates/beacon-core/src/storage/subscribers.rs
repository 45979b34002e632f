//! Repository for subscriber registry operations.
//!
//! The registry is append-only: identifiers are inserted on the first follow
//! event and never updated or removed. Uniqueness is enforced by the primary
//! key, so an insert-if-absent is a single atomic statement and needs no
//! application-level locking.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::SubscriberId,
};

/// Repository for subscriber database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Creates the subscribers table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS subscribers (
                user_id TEXT PRIMARY KEY,
                registered_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a subscriber unless it is already registered.
    ///
    /// Returns `true` when a new row was written, `false` for a duplicate.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached. Duplicates never fail.
    pub async fn register(&self, id: &SubscriberId) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO subscribers (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(id)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Returns every registered identifier.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list_all(&self) -> Result<Vec<SubscriberId>> {
        let ids = sqlx::query_scalar::<_, SubscriberId>(
            r"
            SELECT user_id FROM subscribers
            ",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repository_can_be_created() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let _repo = Repository::new(Arc::new(pool));
    }
}
