//! Code result operations for persisted search findings.
//!
//! A code result is identified by `(repo_name, path, sha)`: the same blob at
//! the same path of the same repository is one finding, no matter how many
//! rules or scan cycles discover it.

use crate::error::{DatabaseError, Result};
use crate::InsertOutcome;
use chrono::{DateTime, Utc};
use leakscan_core::RuleId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Row, Sqlite};

/// Triage status stored in the `status` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FindingStatus {
    /// Regular finding awaiting review
    Normal,
    /// Match in a file type that is usually boilerplate (minified, binary, lockfile)
    LowPriority,
}

impl FindingStatus {
    /// Integer stored in the database.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::LowPriority => 2,
        }
    }

    /// Parse from the stored integer. Unknown values read as `Normal`.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        match value {
            2 => Self::LowPriority,
            _ => Self::Normal,
        }
    }
}

/// A finding as read back from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeResult {
    /// Unique identifier
    pub id: String,
    /// Rule that first discovered this match
    pub rule_id: Option<i64>,
    /// Repository full name (`owner/name`)
    pub repo_name: String,
    /// Repository web URL
    pub repo_url: String,
    /// File path within the repository
    pub path: String,
    /// File name
    pub name: String,
    /// Blob SHA
    pub sha: String,
    /// File web URL
    pub html_url: String,
    /// Matched fragments as returned by the provider
    pub text_matches: JsonValue,
    /// Triage status
    pub status: FindingStatus,
    /// When this finding was first persisted
    pub discovered_at: DateTime<Utc>,
}

/// Parameters for persisting a finding.
#[derive(Debug, Clone)]
pub struct NewCodeResult {
    /// Rule that produced the match
    pub rule_id: RuleId,
    /// Repository full name
    pub repo_name: String,
    /// Repository web URL
    pub repo_url: String,
    /// File path
    pub path: String,
    /// File name
    pub name: String,
    /// Blob SHA
    pub sha: String,
    /// File web URL
    pub html_url: String,
    /// Matched fragments
    pub text_matches: JsonValue,
    /// Triage status
    pub status: FindingStatus,
}

/// Check whether a finding with this natural key is already stored.
pub async fn exists(pool: &Pool<Sqlite>, repo_name: &str, path: &str, sha: &str) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM code_results WHERE repo_name = ? AND path = ? AND sha = ? LIMIT 1",
    )
    .bind(repo_name)
    .bind(path)
    .bind(sha)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Persist a finding unless one with the same natural key exists.
///
/// The check and the write are a single statement, so two tasks racing on the
/// same match produce one `Inserted` and one `AlreadyExists`.
pub async fn insert_if_absent(pool: &Pool<Sqlite>, result: &NewCodeResult) -> Result<InsertOutcome> {
    let text_matches = serde_json::to_string(&result.text_matches).unwrap_or_else(|_| "[]".into());

    let done = sqlx::query(
        "INSERT INTO code_results (id, rule_id, repo_name, repo_url, path, name, sha,
                                   html_url, text_matches, status, discovered_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(repo_name, path, sha) DO NOTHING",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(result.rule_id.get())
    .bind(&result.repo_name)
    .bind(&result.repo_url)
    .bind(&result.path)
    .bind(&result.name)
    .bind(&result.sha)
    .bind(&result.html_url)
    .bind(&text_matches)
    .bind(result.status.as_i64())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(InsertOutcome::from_rows_affected(done.rows_affected()))
}

/// Get findings with the given status, newest first.
pub async fn get_by_status(pool: &Pool<Sqlite>, status: FindingStatus) -> Result<Vec<CodeResult>> {
    let rows = sqlx::query(
        "SELECT id, rule_id, repo_name, repo_url, path, name, sha, html_url,
                text_matches, status, discovered_at
         FROM code_results
         WHERE status = ?
         ORDER BY discovered_at DESC",
    )
    .bind(status.as_i64())
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_code_result).collect()
}

/// Get all findings for one repository.
pub async fn get_by_repo(pool: &Pool<Sqlite>, repo_name: &str) -> Result<Vec<CodeResult>> {
    let rows = sqlx::query(
        "SELECT id, rule_id, repo_name, repo_url, path, name, sha, html_url,
                text_matches, status, discovered_at
         FROM code_results
         WHERE repo_name = ?
         ORDER BY path",
    )
    .bind(repo_name)
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_code_result).collect()
}

/// Total number of stored findings.
pub async fn count(pool: &Pool<Sqlite>) -> Result<i64> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM code_results")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

fn parse_code_result(row: &sqlx::sqlite::SqliteRow) -> Result<CodeResult> {
    let text_matches_str: String = row.try_get("text_matches")?;
    let text_matches: JsonValue = serde_json::from_str(&text_matches_str)
        .map_err(|e| DatabaseError::Decode(format!("invalid text_matches: {e}")))?;

    let discovered_at_str: String = row.try_get("discovered_at")?;
    let discovered_at = DateTime::parse_from_rfc3339(&discovered_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::Decode(format!("invalid discovered_at '{discovered_at_str}': {e}"))
        })?;

    let status: i64 = row.try_get("status")?;

    Ok(CodeResult {
        id: row.try_get("id")?,
        rule_id: row.try_get("rule_id")?,
        repo_name: row.try_get("repo_name")?,
        repo_url: row.try_get("repo_url")?,
        path: row.try_get("path")?,
        name: row.try_get("name")?,
        sha: row.try_get("sha")?,
        html_url: row.try_get("html_url")?,
        text_matches,
        status: FindingStatus::from_i64(status),
        discovered_at,
    })
}
