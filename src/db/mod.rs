//! Database connection management

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    ///
    /// `acquire_timeout` bounds how long a request waits for a connection, so an
    /// unreachable database surfaces as an error instead of a hung request.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Extension trait for safe row access with logging
pub trait SafeRow {
    /// Try to get a value from a column, log error and return None if it fails
    fn try_get_log<'r, T>(&'r self, column: &str) -> Option<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;

    /// Like `try_get_log`, but a missing/undecodable column is an error
    fn require<'r, T>(&'r self, column: &str) -> Result<T, sqlx::Error>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        self.try_get_log(column)
            .ok_or_else(|| sqlx::Error::ColumnNotFound(column.into()))
    }
}

impl SafeRow for sqlx::postgres::PgRow {
    fn try_get_log<'r, T>(&'r self, column: &str) -> Option<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        use sqlx::Row;
        match self.try_get(column) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Failed to read column '{}': {}", column, e);
                None
            }
        }
    }
}
