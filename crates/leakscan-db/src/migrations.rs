//! Schema migrations embedded from `migrations/`.
//!
//! The schema version is the highest successfully applied migration, which is
//! what a deployment is running against. It is not the number of rows in
//! `_sqlx_migrations`.

use crate::error::{DatabaseError, Result};
use sqlx::migrate::Migrator;
use sqlx::{Pool, Sqlite};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Version of the newest migration compiled into this build.
#[must_use]
pub fn latest_version() -> i64 {
    MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Apply every embedded migration that has not run yet.
///
/// # Errors
/// Returns `DatabaseError::Migration` if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    let before = get_schema_version(pool).await?;

    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    let after = get_schema_version(pool).await?;
    if after == before {
        tracing::debug!("Schema already at version {}", after);
    } else {
        tracing::info!("Migrated schema from version {} to {}", before, after);
    }
    Ok(())
}

/// Highest successfully applied migration version, or 0 on a fresh database.
///
/// # Errors
/// Returns `DatabaseError` if the migrations table cannot be queried.
pub async fn get_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let tracked = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    if tracked == 0 {
        return Ok(0);
    }

    let version = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await?;

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DbPool;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = DbPool::new(":memory:", 1).await.expect("create pool");

        run_migrations(pool.pool()).await.expect("run migrations");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name"
        )
        .fetch_all(pool.pool())
        .await
        .expect("query tables");

        assert_eq!(
            tables,
            vec!["code_results", "input_info", "repos", "rules", "scan_cycles"]
        );
    }

    #[tokio::test]
    async fn test_get_schema_version() {
        let pool = DbPool::new(":memory:", 1).await.expect("create pool");

        let version = get_schema_version(pool.pool()).await.expect("get version");
        assert_eq!(version, 0);

        run_migrations(pool.pool()).await.expect("run migrations");

        let version = get_schema_version(pool.pool()).await.expect("get version");
        assert_eq!(version, 5);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = DbPool::new(":memory:", 1).await.expect("create pool");

        run_migrations(pool.pool())
            .await
            .expect("first migration run");
        run_migrations(pool.pool())
            .await
            .expect("second migration run should be idempotent");

        let version = get_schema_version(pool.pool()).await.expect("get version");
        assert_eq!(version, 5);
    }

    #[test]
    fn test_latest_version() {
        assert_eq!(latest_version(), 5);
    }

    #[tokio::test]
    async fn test_version_is_highest_applied_not_row_count() {
        let pool = DbPool::new(":memory:", 1).await.expect("create pool");
        run_migrations(pool.pool()).await.expect("run migrations");

        sqlx::query("DELETE FROM _sqlx_migrations WHERE version IN (2, 3)")
            .execute(pool.pool())
            .await
            .expect("drop history rows");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(pool.pool())
            .await
            .expect("count rows");
        assert_eq!(rows, 3);

        let version = get_schema_version(pool.pool()).await.expect("get version");
        assert_eq!(version, 5);
    }

    #[tokio::test]
    async fn test_failed_migration_does_not_raise_version() {
        let pool = DbPool::new(":memory:", 1).await.expect("create pool");
        run_migrations(pool.pool()).await.expect("run migrations");

        sqlx::query(
            "INSERT INTO _sqlx_migrations (version, description, success, checksum, execution_time)
             VALUES (6, 'half applied', 0, x'00', 0)",
        )
        .execute(pool.pool())
        .await
        .expect("record failed migration");

        let version = get_schema_version(pool.pool()).await.expect("get version");
        assert_eq!(version, 5);
    }
}
