//! Database access layer for the subscriber registry.
//!
//! All SQL lives in the repositories below; callers go through `Storage` or
//! the `SubscriberRegistry` trait.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::debug;

pub mod subscribers;

use crate::error::Result;

/// Container for repository instances sharing one connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Repository for the subscriber registry.
    pub subscribers: Arc<subscribers::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self { subscribers: Arc::new(subscribers::Repository::new(pool)) }
    }

    /// Creates every table the service needs. Safe to run on each start.
    ///
    /// # Errors
    ///
    /// Returns error if a DDL statement fails.
    pub async fn migrate(&self) -> Result<()> {
        self.subscribers.ensure_schema().await?;
        debug!("Registry schema ensured");
        Ok(())
    }

    /// Performs a health check on the database connection.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::StorageUnavailable` if the pool cannot hand out a
    /// connection, `CoreError::Database` for other query failures.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.subscribers.pool()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn storage_can_be_created() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let _storage = Storage::new(pool);
    }
}
