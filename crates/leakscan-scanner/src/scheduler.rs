//! Scan scheduling.
//!
//! A cycle loads the enabled rules, plans them into batches and runs the
//! batches one after another. Each batch occupies at least the configured
//! budget of wall-clock time so the aggregate request rate stays under the
//! provider's search quota. After the last batch the repository backfill
//! runs, then the loop sleeps until the next cycle.

use crate::backfill::{Backfill, BackfillReport};
use crate::executor::{BatchExecutor, BatchReport};
use crate::planner::plan_batches;
use crate::rules::RuleSource;
use crate::settings::ScannerSettings;
use leakscan_db::scan_cycles::{self, CycleTotals};
use leakscan_db::Database;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every batch ran
    Completed,
    /// No rule was enabled
    Skipped,
    /// Rules could not be loaded
    Failed,
}

/// Summary of one scan cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Scan cycle row id, if recording succeeded
    pub cycle_id: Option<String>,
    /// How the cycle ended
    pub outcome: CycleOutcome,
    /// Enabled rules loaded for the cycle
    pub total_rules: usize,
    /// Per-batch results in execution order
    pub batches: Vec<BatchReport>,
    /// Total time spent in pacing sleeps
    pub paced: Duration,
    /// Backfill counters, absent if the cycle never reached backfill
    pub backfill: Option<BackfillReport>,
}

impl CycleReport {
    fn new(cycle_id: Option<String>, outcome: CycleOutcome) -> Self {
        Self {
            cycle_id,
            outcome,
            total_rules: 0,
            batches: Vec::new(),
            paced: Duration::ZERO,
            backfill: None,
        }
    }

    /// New code results stored during the cycle.
    pub fn inserted_results(&self) -> usize {
        self.batches.iter().map(|b| b.totals.inserted_results).sum()
    }

    /// New repositories registered during the cycle.
    pub fn inserted_repos(&self) -> usize {
        self.batches.iter().map(|b| b.totals.inserted_repos).sum()
    }

    /// Number of failed searches during the cycle.
    pub fn failed_searches(&self) -> usize {
        self.batches.iter().map(|b| b.failed_rules.len()).sum()
    }

    fn totals(&self) -> CycleTotals {
        CycleTotals {
            total_rules: saturating_u32(self.total_rules),
            total_batches: saturating_u32(self.batches.len()),
            inserted_results: saturating_u32(self.inserted_results()),
            inserted_repos: saturating_u32(self.inserted_repos()),
        }
    }
}

/// Time left in a batch's budget, or `None` if the budget is spent.
pub fn pacing_delay(elapsed: Duration, budget: Duration) -> Option<Duration> {
    budget.checked_sub(elapsed).filter(|delay| !delay.is_zero())
}

/// Drives scan cycles forever.
pub struct ScanScheduler {
    rules: Arc<dyn RuleSource>,
    executor: BatchExecutor,
    backfill: Arc<dyn Backfill>,
    cycle_store: Option<Arc<Database>>,
    settings: ScannerSettings,
}

impl ScanScheduler {
    pub fn new(
        rules: Arc<dyn RuleSource>,
        executor: BatchExecutor,
        backfill: Arc<dyn Backfill>,
        settings: ScannerSettings,
    ) -> Self {
        Self {
            rules,
            executor,
            backfill,
            cycle_store: None,
            settings,
        }
    }

    /// Record every cycle as a row in the `scan_cycles` table.
    #[must_use]
    pub fn with_cycle_store(mut self, db: Arc<Database>) -> Self {
        self.cycle_store = Some(db);
        self
    }

    /// Run cycles until the task is dropped.
    pub async fn run(&self) {
        loop {
            let report = self.run_cycle().await;
            tracing::info!(
                outcome = ?report.outcome,
                rules = report.total_rules,
                batches = report.batches.len(),
                inserted = report.inserted_results(),
                failed = report.failed_searches(),
                "Scan cycle finished, sleeping {:?}",
                self.settings.cycle_interval
            );
            tokio::time::sleep(self.settings.cycle_interval).await;
        }
    }

    /// Run a single plan, execute and backfill pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle_id = self.open_cycle().await;

        let rules = match self.rules.enabled_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::error!("Failed to load rules: {}", e);
                self.close_cycle_failed(cycle_id.as_deref(), &e.to_string())
                    .await;
                return CycleReport::new(cycle_id, CycleOutcome::Failed);
            }
        };

        if rules.is_empty() {
            tracing::info!("There is no rule enabled");
            self.close_cycle_skipped(cycle_id.as_deref()).await;
            return CycleReport::new(cycle_id, CycleOutcome::Skipped);
        }

        let mut report = CycleReport::new(cycle_id, CycleOutcome::Completed);
        report.total_rules = rules.len();

        let batches = plan_batches(rules, self.settings.batch_size);
        tracing::info!(
            "Planned {} rules into {} batches",
            report.total_rules,
            batches.len()
        );

        for batch in batches.values() {
            let started = Instant::now();
            let batch_report = self.executor.execute_batch(batch).await;
            report.batches.push(batch_report);

            if let Some(delay) = pacing_delay(started.elapsed(), self.settings.per_batch_budget) {
                tracing::debug!("Batch {} under budget, sleeping {:?}", batch.index(), delay);
                tokio::time::sleep(delay).await;
                report.paced += delay;
            }
        }

        match self.backfill.insert_all_repos().await {
            Ok(backfill) => report.backfill = Some(backfill),
            Err(e) => tracing::error!("Repository backfill failed: {}", e),
        }

        self.close_cycle_completed(report.cycle_id.as_deref(), report.totals())
            .await;
        report
    }

    async fn open_cycle(&self) -> Option<String> {
        let db = self.cycle_store.as_ref()?;
        match scan_cycles::create_scan_cycle(db.pool()).await {
            Ok(cycle) => Some(cycle.id),
            Err(e) => {
                tracing::warn!("Failed to record scan cycle: {}", e);
                None
            }
        }
    }

    async fn close_cycle_completed(&self, id: Option<&str>, totals: CycleTotals) {
        if let (Some(db), Some(id)) = (&self.cycle_store, id) {
            if let Err(e) = scan_cycles::complete_scan_cycle(db.pool(), id, totals).await {
                tracing::warn!("Failed to complete scan cycle {}: {}", id, e);
            }
        }
    }

    async fn close_cycle_skipped(&self, id: Option<&str>) {
        if let (Some(db), Some(id)) = (&self.cycle_store, id) {
            if let Err(e) = scan_cycles::skip_scan_cycle(db.pool(), id).await {
                tracing::warn!("Failed to close scan cycle {}: {}", id, e);
            }
        }
    }

    async fn close_cycle_failed(&self, id: Option<&str>, message: &str) {
        if let (Some(db), Some(id)) = (&self.cycle_store, id) {
            if let Err(e) = scan_cycles::fail_scan_cycle(db.pool(), id, message).await {
                tracing::warn!("Failed to close scan cycle {}: {}", id, e);
            }
        }
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
