//! Repositories scheduled for repository-level follow-up.

use crate::error::Result;
use crate::InsertOutcome;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

/// A backfilled repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repo {
    /// Row id
    pub id: i64,
    /// Full name (`owner/name`)
    pub name: String,
    /// Web URL, unique
    pub url: String,
    /// The repository-of-interest row this came from
    pub input_info_id: Option<i64>,
    /// ISO 8601 creation timestamp
    pub created_at: String,
}

/// Record a repository unless its URL is already present.
pub async fn insert_if_absent(
    pool: &Pool<Sqlite>,
    name: &str,
    url: &str,
    input_info_id: Option<i64>,
) -> Result<InsertOutcome> {
    let done = sqlx::query(
        "INSERT INTO repos (name, url, input_info_id, created_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(url) DO NOTHING",
    )
    .bind(name)
    .bind(url)
    .bind(input_info_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(InsertOutcome::from_rows_affected(done.rows_affected()))
}

/// All repositories, oldest first.
pub async fn get_all(pool: &Pool<Sqlite>) -> Result<Vec<Repo>> {
    let rows = sqlx::query("SELECT id, name, url, input_info_id, created_at FROM repos ORDER BY id")
        .fetch_all(pool)
        .await?;

    let mut repos = Vec::with_capacity(rows.len());
    for row in rows {
        repos.push(Repo {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            input_info_id: row.try_get("input_info_id")?,
            created_at: row.try_get("created_at")?,
        });
    }
    Ok(repos)
}
