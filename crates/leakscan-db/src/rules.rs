//! Rule store operations.
//!
//! The `rules` table is the source of truth for the search patterns the
//! scheduler runs each cycle.

use crate::error::{DatabaseError, Result};
use chrono::Utc;
use leakscan_core::{Rule, RuleDefinition, RuleId};
use sqlx::{Pool, Row, Sqlite};

/// Fetch every enabled rule, ordered by id.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a stored id is not a valid `RuleId`.
pub async fn get_enabled_rules(pool: &Pool<Sqlite>) -> Result<Vec<Rule>> {
    let rows = sqlx::query(
        "SELECT id, caption, pattern, description, enabled
         FROM rules
         WHERE enabled = 1
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|row| parse_rule(&row)).collect()
}

/// Insert a new rule and return it.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the insert fails (e.g. duplicate caption).
pub async fn insert_rule(pool: &Pool<Sqlite>, definition: &RuleDefinition) -> Result<Rule> {
    let result = sqlx::query(
        "INSERT INTO rules (caption, pattern, description, enabled, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&definition.caption)
    .bind(&definition.pattern)
    .bind(&definition.description)
    .bind(definition.enabled)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let id = RuleId::new(result.last_insert_rowid())
        .map_err(|e| DatabaseError::Decode(e.to_string()))?;

    Ok(Rule {
        id,
        caption: definition.caption.clone(),
        pattern: definition.pattern.clone(),
        description: definition.description.clone(),
        enabled: definition.enabled,
    })
}

/// Insert a rule, or update pattern/description/enabled of the rule with the
/// same caption.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the statement fails.
pub async fn upsert_rule(pool: &Pool<Sqlite>, definition: &RuleDefinition) -> Result<()> {
    sqlx::query(
        "INSERT INTO rules (caption, pattern, description, enabled, created_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(caption) DO UPDATE SET
            pattern = excluded.pattern,
            description = excluded.description,
            enabled = excluded.enabled",
    )
    .bind(&definition.caption)
    .bind(&definition.pattern)
    .bind(&definition.description)
    .bind(definition.enabled)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Enable or disable a rule.
///
/// # Errors
/// Returns `DatabaseError::NotFoundWithMessage` if no rule has this id.
pub async fn set_enabled(pool: &Pool<Sqlite>, id: RuleId, enabled: bool) -> Result<()> {
    let result = sqlx::query("UPDATE rules SET enabled = ? WHERE id = ?")
        .bind(enabled)
        .bind(id.get())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Rule '{id}' not found"
        )));
    }

    Ok(())
}

fn parse_rule(row: &sqlx::sqlite::SqliteRow) -> Result<Rule> {
    let id: i64 = row.try_get("id")?;
    let id = RuleId::new(id).map_err(|e| DatabaseError::Decode(e.to_string()))?;

    Ok(Rule {
        id,
        caption: row.try_get("caption")?,
        pattern: row.try_get("pattern")?,
        description: row.try_get("description")?,
        enabled: row.try_get("enabled")?,
    })
}
