//! Leakscan Database Layer
//!
//! Provides `SQLite` access for the scan pipeline: the rule store, persisted
//! code findings, repositories of interest, backfilled repositories and the
//! scan cycle audit trail.
//!
//! # Architecture
//!
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//! - **Connection Pooling**: WAL-mode pool for file databases, single connection for `:memory:`
//! - **Deduplication**: natural keys are `UNIQUE` columns; inserts go through
//!   `ON CONFLICT DO NOTHING` and report an [`InsertOutcome`]
//!
//! # Example
//!
//! ```ignore
//! use leakscan_db::Database;
//!
//! let db = Database::new("leakscan.db", 5).await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod code_results;
pub mod connection;
pub mod error;
pub mod input_info;
pub mod migrations;
pub mod repos;
pub mod rules;
pub mod scan_cycles;

// Re-export commonly used types
pub use code_results::{CodeResult, FindingStatus, NewCodeResult};
pub use connection::DbPool;
pub use error::{DatabaseError, Result};
pub use input_info::{InputInfo, NewInputInfo};
pub use repos::Repo;
pub use scan_cycles::{CycleTotals, ScanCycle, ScanCycleStatus};

use std::path::Path;

/// Result of an atomic insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// A row with the same natural key was already present
    AlreadyExists,
}

impl InsertOutcome {
    /// Map the `rows_affected` count of an `ON CONFLICT DO NOTHING` insert.
    #[must_use]
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 {
            Self::AlreadyExists
        } else {
            Self::Inserted
        }
    }

    /// True if a new row was written.
    #[must_use]
    pub fn is_inserted(self) -> bool {
        self == Self::Inserted
    }
}

/// High-level database interface with migrations.
///
/// This provides a convenient wrapper around `DbPool` that handles
/// initialization and migration.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open a database at the specified path.
    ///
    /// # Arguments
    /// * `path` - Path to the database file (or `:memory:` for in-memory)
    /// * `max_connections` - Pool size for file databases
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let pool = DbPool::new(path, max_connections).await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying connection pool.
    ///
    /// This allows direct access to the `SQLx` pool for custom queries.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Check that the database answers queries.
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
