//! Repositories of interest.
//!
//! Every repository that shows up in a search hit is recorded once, keyed by
//! URL, and later expanded into the `repos` table by the backfill sweep.

use crate::error::Result;
use crate::InsertOutcome;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

/// Kind tag for repository entries.
pub const KIND_REPO: &str = "repo";

/// A repository of interest as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputInfo {
    /// Row id
    pub id: i64,
    /// Kind tag, `repo` for repositories
    pub kind: String,
    /// Web URL, unique
    pub url: String,
    /// Display name (`owner/name` for repositories)
    pub name: String,
    /// Whether the backfill sweep has processed this row
    pub expanded: bool,
    /// ISO 8601 creation timestamp
    pub created_at: String,
}

/// Parameters for recording a repository of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInputInfo {
    /// Kind tag
    pub kind: String,
    /// Web URL
    pub url: String,
    /// Display name
    pub name: String,
}

impl NewInputInfo {
    /// A `repo` entry for the given repository URL and full name.
    pub fn repo(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: KIND_REPO.to_string(),
            url: url.into(),
            name: name.into(),
        }
    }
}

/// Check whether an entry with this URL exists.
pub async fn exists_by_url(pool: &Pool<Sqlite>, url: &str) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM input_info WHERE url = ? LIMIT 1")
        .bind(url)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Record an entry unless its URL is already present.
pub async fn insert_if_absent(pool: &Pool<Sqlite>, info: &NewInputInfo) -> Result<InsertOutcome> {
    let done = sqlx::query(
        "INSERT INTO input_info (kind, url, name, expanded, created_at)
         VALUES (?, ?, ?, 0, ?)
         ON CONFLICT(url) DO NOTHING",
    )
    .bind(&info.kind)
    .bind(&info.url)
    .bind(&info.name)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(InsertOutcome::from_rows_affected(done.rows_affected()))
}

/// Entries of the given kind not yet processed by the backfill sweep, oldest first.
pub async fn get_pending(pool: &Pool<Sqlite>, kind: &str) -> Result<Vec<InputInfo>> {
    let rows = sqlx::query(
        "SELECT id, kind, url, name, expanded, created_at
         FROM input_info
         WHERE kind = ? AND expanded = 0
         ORDER BY id",
    )
    .bind(kind)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        entries.push(InputInfo {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            url: row.try_get("url")?,
            name: row.try_get("name")?,
            expanded: row.try_get("expanded")?,
            created_at: row.try_get("created_at")?,
        });
    }
    Ok(entries)
}

/// Flag an entry as processed by the backfill sweep.
pub async fn mark_expanded(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    sqlx::query("UPDATE input_info SET expanded = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Total number of entries.
pub async fn count(pool: &Pool<Sqlite>) -> Result<i64> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM input_info")
        .fetch_one(pool)
        .await?;
    Ok(total)
}
