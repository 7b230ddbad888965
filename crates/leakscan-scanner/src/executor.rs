//! Batch execution.
//!
//! One search client is created per batch and shared by every rule in it.
//! Searches run concurrently up to the configured limit; the batch completes
//! only once every search has finished and its results have been ingested.

use crate::ingest::{IngestReport, ResultIngestor};
use crate::planner::Batch;
use futures::stream::{FuturesUnordered, StreamExt};
use leakscan_core::{Rule, RuleId};
use leakscan_github::{ClientFactory, CodeSearch};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Outcome of executing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Index of the executed batch
    pub batch_index: usize,
    /// Rules whose search was started
    pub searched: usize,
    /// No client could be created, so nothing ran
    pub skipped: bool,
    /// Rules whose search failed
    pub failed_rules: Vec<RuleId>,
    /// Ingestion counters summed over the batch
    pub totals: IngestReport,
}

impl BatchReport {
    fn new(batch_index: usize) -> Self {
        Self {
            batch_index,
            ..Self::default()
        }
    }

    fn record(&mut self, rule_id: RuleId, report: IngestReport) {
        self.searched += 1;
        if report.search_failed {
            self.failed_rules.push(rule_id);
        }
        self.totals += report;
    }
}

/// Runs every rule of a batch against one shared search client.
pub struct BatchExecutor {
    factory: Arc<dyn ClientFactory>,
    ingestor: Arc<ResultIngestor>,
    max_concurrent_searches: NonZeroUsize,
}

impl BatchExecutor {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        ingestor: Arc<ResultIngestor>,
        max_concurrent_searches: NonZeroUsize,
    ) -> Self {
        Self {
            factory,
            ingestor,
            max_concurrent_searches,
        }
    }

    /// Execute `batch` and wait for all of its searches.
    ///
    /// If the client factory fails the batch is skipped entirely. A failing
    /// search never affects its siblings.
    pub async fn execute_batch(&self, batch: &Batch) -> BatchReport {
        let mut report = BatchReport::new(batch.index());

        let client = match self.factory.create_client() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(
                    "Failed to create search client, skipping batch {}: {}",
                    batch.index(),
                    e
                );
                report.skipped = true;
                return report;
            }
        };

        tracing::debug!(
            "Starting batch {} with {} rules",
            batch.index(),
            batch.len()
        );

        let limit = self.max_concurrent_searches.get();
        let mut pending = FuturesUnordered::new();

        for rule in batch.rules() {
            if pending.len() >= limit {
                if let Some((rule_id, ingested)) = pending.next().await {
                    report.record(rule_id, ingested);
                }
            }
            pending.push(self.search_and_ingest(client.as_ref(), rule));
        }

        while let Some((rule_id, ingested)) = pending.next().await {
            report.record(rule_id, ingested);
        }

        tracing::debug!(
            "Batch {} finished: {} new results, {} failed searches",
            batch.index(),
            report.totals.inserted_results,
            report.failed_rules.len()
        );

        report
    }

    async fn search_and_ingest(
        &self,
        client: &dyn CodeSearch,
        rule: &Rule,
    ) -> (RuleId, IngestReport) {
        let outcome = client.search_code(&rule.pattern).await;
        (rule.id, self.ingestor.ingest(rule, &outcome).await)
    }
}
