//! Scan cycle management for tracking scheduler passes.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// One pass of the scheduler over the enabled rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCycle {
    /// Unique identifier for the cycle
    pub id: String,
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// When the cycle finished (if finished)
    pub completed_at: Option<DateTime<Utc>>,
    /// Current status of the cycle
    pub status: ScanCycleStatus,
    /// Enabled rules at planning time
    pub total_rules: u32,
    /// Batches planned
    pub total_batches: u32,
    /// New code results persisted during the cycle
    pub inserted_results: u32,
    /// New repositories of interest persisted during the cycle
    pub inserted_repos: u32,
    /// Error message if the cycle failed
    pub error_message: Option<String>,
}

/// Status of a scan cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScanCycleStatus {
    /// Cycle is running
    InProgress,
    /// All batches ran
    Completed,
    /// No rules were enabled
    Skipped,
    /// Rules could not be loaded
    Failed,
}

impl std::fmt::Display for ScanCycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "InProgress"),
            Self::Completed => write!(f, "Completed"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl ScanCycleStatus {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "Completed" => Self::Completed,
            "Skipped" => Self::Skipped,
            "Failed" => Self::Failed,
            _ => Self::InProgress,
        }
    }
}

/// Counters written when a cycle completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTotals {
    /// Enabled rules at planning time
    pub total_rules: u32,
    /// Batches planned
    pub total_batches: u32,
    /// New code results
    pub inserted_results: u32,
    /// New repositories of interest
    pub inserted_repos: u32,
}

/// Create a new in-progress scan cycle.
///
/// # Errors
/// Returns an error if the database operation fails.
pub async fn create_scan_cycle(pool: &SqlitePool) -> Result<ScanCycle> {
    let id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let status = ScanCycleStatus::InProgress;

    sqlx::query("INSERT INTO scan_cycles (id, started_at, status) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(started_at.to_rfc3339())
        .bind(status.to_string())
        .execute(pool)
        .await?;

    Ok(ScanCycle {
        id,
        started_at,
        completed_at: None,
        status,
        total_rules: 0,
        total_batches: 0,
        inserted_results: 0,
        inserted_repos: 0,
        error_message: None,
    })
}

/// Close a cycle as `Completed` with its totals.
pub async fn complete_scan_cycle(pool: &SqlitePool, id: &str, totals: CycleTotals) -> Result<()> {
    let result = sqlx::query(
        "UPDATE scan_cycles
         SET status = ?, completed_at = ?, total_rules = ?, total_batches = ?,
             inserted_results = ?, inserted_repos = ?
         WHERE id = ?",
    )
    .bind(ScanCycleStatus::Completed.to_string())
    .bind(Utc::now().to_rfc3339())
    .bind(i64::from(totals.total_rules))
    .bind(i64::from(totals.total_batches))
    .bind(i64::from(totals.inserted_results))
    .bind(i64::from(totals.inserted_repos))
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

/// Close a cycle as `Skipped` (no enabled rules).
pub async fn skip_scan_cycle(pool: &SqlitePool, id: &str) -> Result<()> {
    finish(pool, id, ScanCycleStatus::Skipped, None).await
}

/// Close a cycle as `Failed` with an error message.
pub async fn fail_scan_cycle(pool: &SqlitePool, id: &str, error_message: &str) -> Result<()> {
    finish(pool, id, ScanCycleStatus::Failed, Some(error_message)).await
}

async fn finish(
    pool: &SqlitePool,
    id: &str,
    status: ScanCycleStatus,
    error_message: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE scan_cycles SET status = ?, completed_at = ?, error_message = ? WHERE id = ?",
    )
    .bind(status.to_string())
    .bind(Utc::now().to_rfc3339())
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

fn ensure_updated(rows_affected: u64, id: &str) -> Result<()> {
    if rows_affected == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Scan cycle '{id}' not found"
        )));
    }
    Ok(())
}

/// Fetch a scan cycle by id.
pub async fn get_scan_cycle(pool: &SqlitePool, id: &str) -> Result<ScanCycle> {
    let row = sqlx::query(
        "SELECT id, started_at, completed_at, status, total_rules, total_batches,
                inserted_results, inserted_repos, error_message
         FROM scan_cycles WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFoundWithMessage(format!("Scan cycle '{id}' not found")))?;

    let started_at: String = row.try_get("started_at")?;
    let started_at = DateTime::parse_from_rfc3339(&started_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid started_at '{started_at}': {e}")))?;

    let completed_at: Option<String> = row.try_get("completed_at")?;
    let completed_at = completed_at.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    });

    let status: String = row.try_get("status")?;

    Ok(ScanCycle {
        id: row.try_get("id")?,
        started_at,
        completed_at,
        status: ScanCycleStatus::parse(&status),
        total_rules: decode_count(&row, "total_rules")?,
        total_batches: decode_count(&row, "total_batches")?,
        inserted_results: decode_count(&row, "inserted_results")?,
        inserted_repos: decode_count(&row, "inserted_repos")?,
        error_message: row.try_get("error_message")?,
    })
}

fn decode_count(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| DatabaseError::Decode(format!("{column} out of range: {value}")))
}
