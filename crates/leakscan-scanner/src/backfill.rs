use crate::error::Result;
use async_trait::async_trait;
use leakscan_db::input_info::{self, KIND_REPO};
use leakscan_db::{repos, Database, InsertOutcome};
use std::sync::Arc;

/// Counters from one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Pending inputs examined
    pub scanned: usize,
    /// Repositories newly inserted
    pub inserted: usize,
}

/// Post-cycle step that expands discovered inputs into repositories.
#[async_trait]
pub trait Backfill: Send + Sync {
    async fn insert_all_repos(&self) -> Result<BackfillReport>;
}

/// Promotes pending `repo` inputs into the repository table.
pub struct RepoBackfill {
    db: Arc<Database>,
}

impl RepoBackfill {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Backfill for RepoBackfill {
    async fn insert_all_repos(&self) -> Result<BackfillReport> {
        let pool = self.db.pool();
        let pending = input_info::get_pending(pool, KIND_REPO).await?;
        let mut report = BackfillReport {
            scanned: pending.len(),
            inserted: 0,
        };

        for info in pending {
            match repos::insert_if_absent(pool, &info.name, &info.url, Some(info.id)).await {
                Ok(outcome) => {
                    if outcome == InsertOutcome::Inserted {
                        report.inserted += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to insert repository {}: {}", info.url, e);
                    continue;
                }
            }
            if let Err(e) = input_info::mark_expanded(pool, info.id).await {
                tracing::warn!("Failed to mark input {} expanded: {}", info.id, e);
            }
        }

        tracing::info!(
            "Backfill inserted {} of {} pending repositories",
            report.inserted,
            report.scanned
        );

        Ok(report)
    }
}
