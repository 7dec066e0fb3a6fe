// Database Connection Pool
// Manages PostgreSQL and SQLite connection pools with sqlx

use crate::db::config::{DatabaseConfig, DatabaseType, is_in_memory, postgres_url};
use crate::error::ColumbusError;
use sqlx::postgres::PgRow;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{FromRow, Pool, Postgres, Sqlite};
use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

/// Database pool enum supporting both PostgreSQL and SQLite
#[derive(Clone)]
pub enum DatabasePool {
    Postgres(Pool<Postgres>),
    Sqlite(Pool<Sqlite>),
}

impl DatabasePool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> crate::Result<Self> {
        let pool = match config {
            DatabaseConfig::Postgres {
                url,
                max_connections,
            } => {
                let url = postgres_url(url)?;

                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections((*max_connections).max(1))
                    .acquire_timeout(Duration::from_secs(30))
                    .connect(url.as_str())
                    .await
                    .map_err(|e| {
                        ColumbusError::DatabaseError(format!("PostgreSQL connection failed: {}", e))
                    })?;

                DatabasePool::Postgres(pool)
            }
            DatabaseConfig::Sqlite { path } => {
                let connect_options = if is_in_memory(path) {
                    SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                        ColumbusError::DatabaseError(format!(
                            "Failed to open in-memory SQLite: {}",
                            e
                        ))
                    })?
                } else {
                    SqliteConnectOptions::new()
                        .filename(path)
                        .create_if_missing(true)
                }
                .busy_timeout(Duration::from_secs(30));

                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(1) // SQLite is single-writer
                    .acquire_timeout(Duration::from_secs(30))
                    .connect_with(connect_options)
                    .await
                    .map_err(|e| {
                        ColumbusError::DatabaseError(format!("SQLite connection failed: {}", e))
                    })?;

                DatabasePool::Sqlite(pool)
            }
        };

        Ok(pool)
    }

    /// Get database type
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DatabasePool::Postgres(_) => DatabaseType::Postgres,
            DatabasePool::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// Close the connection pool
    pub async fn close(&self) {
        match self {
            DatabasePool::Postgres(pool) => pool.close().await,
            DatabasePool::Sqlite(pool) => pool.close().await,
        }
    }

    /// Rewrite a query written with PostgreSQL placeholders for this backend.
    ///
    /// Queries are written once with `$1, $2, ...`; SQLite receives the
    /// numbered form `?1, ?2, ...` which binds by the same positions.
    pub fn sql<'a>(&self, query: &'a str) -> Cow<'a, str> {
        match self {
            DatabasePool::Postgres(_) => Cow::Borrowed(query),
            DatabasePool::Sqlite(_) => {
                let mut out = String::with_capacity(query.len());
                let mut chars = query.chars().peekable();
                while let Some(c) = chars.next() {
                    if c == '$' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                        out.push('?');
                    } else {
                        out.push(c);
                    }
                }
                Cow::Owned(out)
            }
        }
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(&self, query: &str, bindings: Vec<BindValue>) -> crate::Result<u64> {
        let query = self.sql(query);
        let affected = match self {
            DatabasePool::Postgres(pool) => {
                let mut q = sqlx::query(&query);
                for binding in bindings {
                    q = binding.bind_postgres(q);
                }
                q.execute(pool)
                    .await
                    .map_err(|e| ColumbusError::DatabaseError(format!("Query failed: {}", e)))?
                    .rows_affected()
            }
            DatabasePool::Sqlite(pool) => {
                let mut q = sqlx::query(&query);
                for binding in bindings {
                    q = binding.bind_sqlite(q);
                }
                q.execute(pool)
                    .await
                    .map_err(|e| ColumbusError::DatabaseError(format!("Query failed: {}", e)))?
                    .rows_affected()
            }
        };
        Ok(affected)
    }

    /// Execute a SELECT query and return optional row with single i64 column
    pub async fn fetch_optional_id(
        &self,
        query: &str,
        bindings: Vec<BindValue>,
    ) -> crate::Result<Option<i64>> {
        let rows: Vec<(i64,)> = self.fetch_all_as(query, bindings).await?;
        Ok(rows.into_iter().next().map(|(id,)| id))
    }

    /// Execute a SELECT query and map every row with `FromRow`
    pub async fn fetch_all_as<T>(
        &self,
        query: &str,
        bindings: Vec<BindValue>,
    ) -> crate::Result<Vec<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow>,
    {
        let query = self.sql(query);
        match self {
            DatabasePool::Postgres(pool) => {
                let mut q = sqlx::query(&query);
                for binding in bindings {
                    q = binding.bind_postgres(q);
                }
                let rows = q
                    .fetch_all(pool)
                    .await
                    .map_err(|e| ColumbusError::DatabaseError(format!("Query failed: {}", e)))?;
                rows.iter()
                    .map(|row| T::from_row(row).map_err(ColumbusError::from))
                    .collect()
            }
            DatabasePool::Sqlite(pool) => {
                let mut q = sqlx::query(&query);
                for binding in bindings {
                    q = binding.bind_sqlite(q);
                }
                let rows = q
                    .fetch_all(pool)
                    .await
                    .map_err(|e| ColumbusError::DatabaseError(format!("Query failed: {}", e)))?;
                rows.iter()
                    .map(|row| T::from_row(row).map_err(ColumbusError::from))
                    .collect()
            }
        }
    }
}

/// Enum to hold different bind value types for database-agnostic query binding
#[derive(Debug, Clone)]
pub enum BindValue {
    Int64(i64),
    Int32(i32),
    String(String),
}

impl BindValue {
    /// Bind this value to a Postgres query
    fn bind_postgres<'q>(
        self,
        query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
        match self {
            BindValue::Int64(v) => query.bind(v),
            BindValue::Int32(v) => query.bind(v),
            BindValue::String(v) => query.bind(v),
        }
    }

    /// Bind this value to a SQLite query
    fn bind_sqlite<'q>(
        self,
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            BindValue::Int64(v) => query.bind(v),
            BindValue::Int32(v) => query.bind(v),
            BindValue::String(v) => query.bind(v),
        }
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        BindValue::String(v.to_string())
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        BindValue::String(v)
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        BindValue::Int64(v)
    }
}

impl From<i32> for BindValue {
    fn from(v: i32) -> Self {
        BindValue::Int32(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let config = DatabaseConfig::sqlite(PathBuf::from(":memory:"));
        let pool = DatabasePool::new(&config)
            .await
            .expect("test assertion should succeed");

        assert_eq!(pool.db_type(), DatabaseType::Sqlite);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_placeholder_rewrite() {
        let config = DatabaseConfig::sqlite(PathBuf::from(":memory:"));
        let pool = DatabasePool::new(&config).await.unwrap();

        assert_eq!(
            pool.sql("SELECT id FROM domains WHERE label = $1 AND tld = $2"),
            "SELECT id FROM domains WHERE label = ?1 AND tld = ?2"
        );

        let row: Vec<(i64,)> = pool
            .fetch_all_as("SELECT $1 + $2", vec![40i64.into(), 2i64.into()])
            .await
            .unwrap();
        assert_eq!(row[0].0, 42);

        pool.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_file_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columbus.db");

        let pool = DatabasePool::new(&DatabaseConfig::sqlite(&path)).await.unwrap();
        assert!(path.exists());
        pool.close().await;
    }

    #[tokio::test]
    async fn test_postgres_url_rejected_before_connecting() {
        let config = DatabaseConfig::postgres("mysql://localhost/columbus");
        assert!(matches!(
            DatabasePool::new(&config).await,
            Err(ColumbusError::ConfigError { .. })
        ));
    }
}
