// Database Migrations
// Applies the embedded schema for PostgreSQL and SQLite

use crate::db::connection::{BindValue, DatabasePool};
use crate::error::ColumbusError;
use tracing::{debug, info};

/// A versioned schema step
struct Migration {
    version: i64,
    description: &'static str,
    sql: &'static str,
}

const POSTGRES_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 20250601001,
        description: "create_domains",
        sql: include_str!("../../migrations/postgres/20250601_001_create_domains.sql"),
    },
    Migration {
        version: 20250601002,
        description: "create_records",
        sql: include_str!("../../migrations/postgres/20250601_002_create_records.sql"),
    },
    Migration {
        version: 20250601003,
        description: "create_toplist",
        sql: include_str!("../../migrations/postgres/20250601_003_create_toplist.sql"),
    },
    Migration {
        version: 20250601004,
        description: "create_not_found",
        sql: include_str!("../../migrations/postgres/20250601_004_create_not_found.sql"),
    },
];

const SQLITE_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 20250601001,
        description: "create_domains",
        sql: include_str!("../../migrations/sqlite/20250601_001_create_domains.sql"),
    },
    Migration {
        version: 20250601002,
        description: "create_records",
        sql: include_str!("../../migrations/sqlite/20250601_002_create_records.sql"),
    },
    Migration {
        version: 20250601003,
        description: "create_toplist",
        sql: include_str!("../../migrations/sqlite/20250601_003_create_toplist.sql"),
    },
    Migration {
        version: 20250601004,
        description: "create_not_found",
        sql: include_str!("../../migrations/sqlite/20250601_004_create_not_found.sql"),
    },
];

/// Run database migrations
pub async fn run_migrations(pool: &DatabasePool) -> crate::Result<()> {
    let migrations = match pool {
        DatabasePool::Postgres(_) => POSTGRES_MIGRATIONS,
        DatabasePool::Sqlite(_) => SQLITE_MIGRATIONS,
    };

    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _columbus_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            installed_on BIGINT NOT NULL
        )
        "#,
        vec![],
    )
    .await
    .map_err(|e| {
        ColumbusError::DatabaseError(format!("Failed to create migrations table: {}", e))
    })?;

    let mut applied = 0;
    for migration in migrations {
        let already_run = pool
            .fetch_optional_id(
                "SELECT version FROM _columbus_migrations WHERE version = $1",
                vec![BindValue::Int64(migration.version)],
            )
            .await?
            .is_some();

        if already_run {
            continue;
        }

        for statement in migration.sql.split(';').filter(|s| !is_blank(s)) {
            pool.execute(statement, vec![]).await.map_err(|e| {
                ColumbusError::DatabaseError(format!(
                    "Failed to execute migration {}: {}",
                    migration.description, e
                ))
            })?;
        }

        pool.execute(
            "INSERT INTO _columbus_migrations (version, description, installed_on) VALUES ($1, $2, $3)",
            vec![
                BindValue::Int64(migration.version),
                BindValue::from(migration.description),
                BindValue::Int64(chrono::Utc::now().timestamp()),
            ],
        )
        .await?;

        debug!("Applied migration {}", migration.description);
        applied += 1;
    }

    if applied > 0 {
        info!("Applied {} database migration(s)", applied);
    }

    Ok(())
}

/// True when a statement fragment holds only whitespace and comments
fn is_blank(statement: &str) -> bool {
    statement
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::config::DatabaseConfig;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_migrations_with_sqlite_are_idempotent() {
        let config = DatabaseConfig::sqlite(PathBuf::from(":memory:"));
        let pool = DatabasePool::new(&config).await.unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let versions: Vec<(i64,)> = pool
            .fetch_all_as("SELECT version FROM _columbus_migrations", vec![])
            .await
            .unwrap();
        assert_eq!(versions.len(), SQLITE_MIGRATIONS.len());

        pool.close().await;
    }

    #[test]
    fn test_blank_statement_detection() {
        assert!(is_blank("\n  -- trailing comment\n"));
        assert!(!is_blank("-- comment\nCREATE TABLE t (id INTEGER)"));
    }
}
