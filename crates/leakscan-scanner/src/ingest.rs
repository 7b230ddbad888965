//! Result ingestion.
//!
//! Turns the pages returned for one rule into persisted findings. Every match
//! registers its repository as pending input and is stored as a code result
//! unless the same file version was already recorded. Inserts rely on the
//! database's unique constraints, so concurrent ingestion of overlapping
//! results never produces duplicates.

use crate::filter::ExtensionFilter;
use leakscan_core::Rule;
use leakscan_db::code_results::{self, FindingStatus, NewCodeResult};
use leakscan_db::input_info::{self, NewInputInfo};
use leakscan_db::{Database, InsertOutcome};
use leakscan_github::{CodeSearchPage, GithubError, RawMatch};
use serde_json::Value as JsonValue;
use std::ops::AddAssign;
use std::sync::Arc;

/// Counters produced by ingesting one search outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Code results newly stored
    pub inserted_results: usize,
    /// Repositories newly registered as pending input
    pub inserted_repos: usize,
    /// Newly stored results flagged low priority
    pub low_priority: usize,
    /// Matches whose natural key was already stored
    pub duplicates: usize,
    /// Items that could not be decoded
    pub malformed: usize,
    /// Records that failed to persist
    pub failed: usize,
    /// The search itself failed and nothing was ingested
    pub search_failed: bool,
}

impl IngestReport {
    fn search_failed() -> Self {
        Self {
            search_failed: true,
            ..Self::default()
        }
    }
}

impl AddAssign for IngestReport {
    fn add_assign(&mut self, other: Self) {
        self.inserted_results += other.inserted_results;
        self.inserted_repos += other.inserted_repos;
        self.low_priority += other.low_priority;
        self.duplicates += other.duplicates;
        self.malformed += other.malformed;
        self.failed += other.failed;
        self.search_failed |= other.search_failed;
    }
}

/// Persists code search results.
pub struct ResultIngestor {
    db: Arc<Database>,
    filter: ExtensionFilter,
}

impl ResultIngestor {
    pub fn new(db: Arc<Database>, filter: ExtensionFilter) -> Self {
        Self { db, filter }
    }

    /// Ingest the outcome of searching for `rule`.
    ///
    /// A failed search is logged and ingests nothing. Per-record failures are
    /// logged and counted; they never abort the remaining records.
    pub async fn ingest(
        &self,
        rule: &Rule,
        outcome: &Result<Vec<CodeSearchPage>, GithubError>,
    ) -> IngestReport {
        let pages = match outcome {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(rule = %rule, kind = e.kind(), "Search failed: {}", e);
                return IngestReport::search_failed();
            }
        };

        let mut report = IngestReport::default();
        if pages.iter().all(CodeSearchPage::is_empty) {
            tracing::debug!(rule = %rule, "No matches");
            return report;
        }

        for page in pages {
            let page_report = self.ingest_page(rule, page).await;
            tracing::info!(
                rule = %rule,
                "Has inserted {} results into code_results",
                page_report.inserted_results
            );
            report += page_report;
        }

        report
    }

    async fn ingest_page(&self, rule: &Rule, page: &CodeSearchPage) -> IngestReport {
        let mut report = IngestReport::default();

        for item in page.matches() {
            match item {
                Ok(raw) => self.ingest_match(rule, &raw, &mut report).await,
                Err(e) => {
                    tracing::warn!(rule = %rule, "Skipping malformed search item: {}", e);
                    report.malformed += 1;
                }
            }
        }

        report
    }

    async fn ingest_match(&self, rule: &Rule, raw: &RawMatch, report: &mut IngestReport) {
        let pool = self.db.pool();

        let info = NewInputInfo::repo(&raw.repository.html_url, &raw.repository.full_name);
        match input_info::insert_if_absent(pool, &info).await {
            Ok(InsertOutcome::Inserted) => report.inserted_repos += 1,
            Ok(InsertOutcome::AlreadyExists) => {}
            Err(e) => {
                tracing::error!(
                    "Failed to record repository {}: {}",
                    raw.repository.html_url,
                    e
                );
                report.failed += 1;
            }
        }

        let status = if self.filter.is_low_priority(&raw.path) {
            FindingStatus::LowPriority
        } else {
            FindingStatus::Normal
        };

        let result = NewCodeResult {
            rule_id: rule.id,
            repo_name: raw.repository.full_name.clone(),
            repo_url: raw.repository.html_url.clone(),
            path: raw.path.clone(),
            name: raw.name.clone(),
            sha: raw.sha.clone(),
            html_url: raw.html_url.clone(),
            text_matches: serde_json::to_value(&raw.text_matches)
                .unwrap_or_else(|_| JsonValue::Array(Vec::new())),
            status,
        };

        match code_results::insert_if_absent(pool, &result).await {
            Ok(InsertOutcome::Inserted) => {
                report.inserted_results += 1;
                if status == FindingStatus::LowPriority {
                    report.low_priority += 1;
                }
            }
            Ok(InsertOutcome::AlreadyExists) => report.duplicates += 1,
            Err(e) => {
                tracing::error!(
                    "Failed to insert code result {}/{}: {}",
                    result.repo_name,
                    result.path,
                    e
                );
                report.failed += 1;
            }
        }
    }
}
