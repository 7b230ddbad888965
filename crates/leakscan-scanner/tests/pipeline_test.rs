use async_trait::async_trait;
use leakscan_core::{Rule, RuleDefinition, RuleId};
use leakscan_db::code_results::{self, FindingStatus};
use leakscan_db::scan_cycles::{self, ScanCycleStatus};
use leakscan_db::{input_info, repos, Database};
use leakscan_github::{ClientFactory, CodeSearch, CodeSearchPage, GithubError};
use leakscan_scanner::{
    plan_batches, Backfill, BackfillReport, BatchExecutor, CycleOutcome, DbRuleSource,
    ExtensionFilter, RepoBackfill, ResultIngestor, RuleSource, ScanError, ScanScheduler,
    ScannerSettings,
};
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Search double returning canned pages per pattern.
#[derive(Default)]
struct FakeSearch {
    pages: HashMap<String, Vec<CodeSearchPage>>,
    failing: HashSet<String>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl CodeSearch for FakeSearch {
    async fn search_code(&self, pattern: &str) -> leakscan_github::Result<Vec<CodeSearchPage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(pattern) {
            return Err(GithubError::Api {
                status: 422,
                message: "Validation Failed".to_string(),
            });
        }
        Ok(self.pages.get(pattern).cloned().unwrap_or_default())
    }
}

struct FakeFactory {
    search: Option<Arc<FakeSearch>>,
}

impl ClientFactory for FakeFactory {
    fn create_client(&self) -> leakscan_github::Result<Arc<dyn CodeSearch>> {
        match &self.search {
            Some(search) => Ok(Arc::clone(search) as Arc<dyn CodeSearch>),
            None => Err(GithubError::MissingToken),
        }
    }
}

struct FixedRules(Vec<Rule>);

#[async_trait]
impl RuleSource for FixedRules {
    async fn enabled_rules(&self) -> leakscan_scanner::Result<Vec<Rule>> {
        Ok(self.0.clone())
    }
}

struct BrokenRules;

#[async_trait]
impl RuleSource for BrokenRules {
    async fn enabled_rules(&self) -> leakscan_scanner::Result<Vec<Rule>> {
        Err(ScanError::Database(leakscan_db::DatabaseError::Open(
            "database is locked".to_string(),
        )))
    }
}

#[derive(Default)]
struct CountingBackfill {
    calls: AtomicUsize,
}

#[async_trait]
impl Backfill for CountingBackfill {
    async fn insert_all_repos(&self) -> leakscan_scanner::Result<BackfillReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(BackfillReport::default())
    }
}

fn rule(id: i64) -> Rule {
    Rule {
        id: RuleId::new(id).expect("valid rule id"),
        caption: format!("rule-{id}"),
        pattern: format!("pattern-{id}"),
        description: None,
        enabled: true,
    }
}

fn rules(count: i64) -> Vec<Rule> {
    (1..=count).map(rule).collect()
}

fn item(repo: &str, path: &str, sha: &str) -> JsonValue {
    json!({
        "name": path,
        "path": path,
        "sha": sha,
        "html_url": format!("https://github.com/{repo}/blob/main/{path}"),
        "repository": {
            "full_name": repo,
            "html_url": format!("https://github.com/{repo}")
        },
        "text_matches": []
    })
}

fn page(items: Vec<JsonValue>) -> CodeSearchPage {
    CodeSearchPage {
        total_count: items.len() as u64,
        incomplete_results: false,
        items,
    }
}

fn non_zero(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).expect("non-zero")
}

async fn memory_db() -> Arc<Database> {
    let db = Database::new(":memory:", 1)
        .await
        .expect("create database");
    db.run_migrations().await.expect("run migrations");
    Arc::new(db)
}

fn executor(db: &Arc<Database>, search: Option<Arc<FakeSearch>>, limit: usize) -> BatchExecutor {
    let ingestor = Arc::new(ResultIngestor::new(
        Arc::clone(db),
        ExtensionFilter::new([".min.js", ".lock"]),
    ));
    BatchExecutor::new(Arc::new(FakeFactory { search }), ingestor, non_zero(limit))
}

fn settings(batch_size: usize, budget: Duration) -> ScannerSettings {
    ScannerSettings {
        batch_size: non_zero(batch_size),
        per_batch_budget: budget,
        cycle_interval: Duration::from_secs(900),
        max_concurrent_searches: non_zero(batch_size),
    }
}

#[tokio::test]
async fn test_missing_client_skips_batch() {
    let db = memory_db().await;
    let executor = executor(&db, None, 25);
    let batches = plan_batches(rules(3), non_zero(25));

    let report = executor.execute_batch(&batches[&0]).await;

    assert!(report.skipped);
    assert_eq!(report.searched, 0);
    assert!(report.failed_rules.is_empty());
    assert_eq!(code_results::count(db.pool()).await.expect("count"), 0);
}

#[tokio::test]
async fn test_failed_search_does_not_affect_siblings() {
    let db = memory_db().await;
    let mut search = FakeSearch::default();
    search.failing.insert("pattern-2".to_string());
    search.pages.insert(
        "pattern-1".to_string(),
        vec![page(vec![item("octo/app", "config.yml", "a")])],
    );
    search.pages.insert(
        "pattern-3".to_string(),
        vec![page(vec![item("octo/web", "dist/app.min.js", "b")])],
    );
    let search = Arc::new(search);
    let executor = executor(&db, Some(Arc::clone(&search)), 25);
    let batches = plan_batches(rules(3), non_zero(25));

    let report = executor.execute_batch(&batches[&0]).await;

    assert!(!report.skipped);
    assert_eq!(report.searched, 3);
    assert_eq!(report.failed_rules, vec![RuleId::new(2).expect("valid")]);
    assert_eq!(report.totals.inserted_results, 2);
    assert_eq!(report.totals.low_priority, 1);
    assert_eq!(search.calls.load(Ordering::SeqCst), 3);

    let low = code_results::get_by_status(db.pool(), FindingStatus::LowPriority)
        .await
        .expect("query");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].repo_name, "octo/web");
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let db = memory_db().await;
    let search = Arc::new(FakeSearch::default());
    let executor = executor(&db, Some(Arc::clone(&search)), 4);
    let batches = plan_batches(rules(10), non_zero(10));

    let report = executor.execute_batch(&batches[&0]).await;

    assert_eq!(report.searched, 10);
    assert_eq!(search.calls.load(Ordering::SeqCst), 10);
    assert!(search.max_in_flight.load(Ordering::SeqCst) <= 4);
    assert_eq!(search.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestion_of_same_repository() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = Database::new(dir.path().join("leakscan.db"), 5)
        .await
        .expect("create database");
    db.run_migrations().await.expect("run migrations");
    let db = Arc::new(db);

    let ingestor = Arc::new(ResultIngestor::new(
        Arc::clone(&db),
        ExtensionFilter::default(),
    ));
    let shared = vec![page(vec![
        item("octo/app", ".env", "1"),
        item("octo/app", "settings.py", "2"),
    ])];

    let mut handles = Vec::new();
    for id in 1..=8 {
        let ingestor = Arc::clone(&ingestor);
        let outcome = Ok(shared.clone());
        handles.push(tokio::spawn(async move {
            ingestor.ingest(&rule(id), &outcome).await
        }));
    }

    let mut inserted_results = 0;
    let mut inserted_repos = 0;
    for handle in handles {
        let report = handle.await.expect("join ingestion");
        assert_eq!(report.failed, 0);
        inserted_results += report.inserted_results;
        inserted_repos += report.inserted_repos;
    }

    assert_eq!(inserted_results, 2);
    assert_eq!(inserted_repos, 1);
    assert_eq!(input_info::count(db.pool()).await.expect("count"), 1);
    assert_eq!(code_results::count(db.pool()).await.expect("count"), 2);
}

#[tokio::test]
async fn test_cycle_persists_results_and_backfills() {
    let db = memory_db().await;
    for caption in ["aws", "slack"] {
        leakscan_db::rules::insert_rule(
            db.pool(),
            &RuleDefinition {
                caption: caption.to_string(),
                pattern: format!("{caption} key"),
                description: None,
                enabled: true,
            },
        )
        .await
        .expect("insert rule");
    }

    let mut search = FakeSearch::default();
    search.pages.insert(
        "aws key".to_string(),
        vec![page(vec![item("octo/app", "deploy.sh", "a")])],
    );
    search.pages.insert(
        "slack key".to_string(),
        vec![page(vec![
            item("octo/app", "bot.py", "b"),
            item("octo/chat", "bot.py", "c"),
        ])],
    );

    let scheduler = ScanScheduler::new(
        Arc::new(DbRuleSource::new(Arc::clone(&db))),
        executor(&db, Some(Arc::new(search)), 1),
        Arc::new(RepoBackfill::new(Arc::clone(&db))),
        settings(1, Duration::ZERO),
    )
    .with_cycle_store(Arc::clone(&db));

    let report = scheduler.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.total_rules, 2);
    assert_eq!(report.batches.len(), 2);
    assert_eq!(report.inserted_results(), 3);
    assert_eq!(report.inserted_repos(), 2);
    assert_eq!(report.paced, Duration::ZERO);
    assert_eq!(
        report.backfill,
        Some(BackfillReport {
            scanned: 2,
            inserted: 2
        })
    );
    assert_eq!(repos::get_all(db.pool()).await.expect("repos").len(), 2);

    let cycle_id = report.cycle_id.expect("cycle recorded");
    let cycle = scan_cycles::get_scan_cycle(db.pool(), &cycle_id)
        .await
        .expect("get cycle");
    assert_eq!(cycle.status, ScanCycleStatus::Completed);
    assert_eq!(cycle.total_batches, 2);
    assert_eq!(cycle.inserted_results, 3);
    assert!(cycle.completed_at.is_some());

    // A second cycle over the same hits stores nothing new
    let again = scheduler.run_cycle().await;
    assert_eq!(again.inserted_results(), 0);
    assert_eq!(code_results::count(db.pool()).await.expect("count"), 3);
}

#[tokio::test]
async fn test_cycle_without_rules_is_skipped() {
    let db = memory_db().await;
    let backfill = Arc::new(CountingBackfill::default());
    let scheduler = ScanScheduler::new(
        Arc::new(FixedRules(Vec::new())),
        executor(&db, Some(Arc::new(FakeSearch::default())), 25),
        Arc::clone(&backfill) as Arc<dyn Backfill>,
        settings(25, Duration::ZERO),
    )
    .with_cycle_store(Arc::clone(&db));

    let report = scheduler.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::Skipped);
    assert!(report.batches.is_empty());
    assert_eq!(backfill.calls.load(Ordering::SeqCst), 0);

    let cycle = scan_cycles::get_scan_cycle(db.pool(), &report.cycle_id.expect("cycle id"))
        .await
        .expect("get cycle");
    assert_eq!(cycle.status, ScanCycleStatus::Skipped);
}

#[tokio::test]
async fn test_rule_load_failure_fails_cycle() {
    let db = memory_db().await;
    let scheduler = ScanScheduler::new(
        Arc::new(BrokenRules),
        executor(&db, Some(Arc::new(FakeSearch::default())), 25),
        Arc::new(CountingBackfill::default()),
        settings(25, Duration::ZERO),
    )
    .with_cycle_store(Arc::clone(&db));

    let report = scheduler.run_cycle().await;
    assert_eq!(report.outcome, CycleOutcome::Failed);

    let cycle = scan_cycles::get_scan_cycle(db.pool(), &report.cycle_id.expect("cycle id"))
        .await
        .expect("get cycle");
    assert_eq!(cycle.status, ScanCycleStatus::Failed);
    assert!(cycle
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("database is locked")));
}

#[tokio::test]
async fn test_fast_batches_are_paced_to_budget() {
    let db = memory_db().await;
    let backfill = Arc::new(CountingBackfill::default());
    let scheduler = ScanScheduler::new(
        Arc::new(FixedRules(rules(60))),
        executor(&db, Some(Arc::new(FakeSearch::default())), 25),
        Arc::clone(&backfill) as Arc<dyn Backfill>,
        settings(25, Duration::from_secs(60)),
    );

    tokio::time::pause();
    let started = tokio::time::Instant::now();
    let report = scheduler.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    let sizes: Vec<usize> = report.batches.iter().map(|b| b.searched).collect();
    assert_eq!(sizes, vec![25, 25, 10]);
    assert!(report.paced > Duration::from_secs(179));
    assert!(report.paced <= Duration::from_secs(180));
    assert!(started.elapsed() >= Duration::from_secs(180));
    assert_eq!(backfill.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_batch_is_not_paced() {
    let db = memory_db().await;
    let search = FakeSearch {
        latency: Some(Duration::from_secs(65)),
        ..FakeSearch::default()
    };
    let scheduler = ScanScheduler::new(
        Arc::new(FixedRules(rules(3))),
        executor(&db, Some(Arc::new(search)), 25),
        Arc::new(CountingBackfill::default()),
        settings(25, Duration::from_secs(60)),
    );

    tokio::time::pause();
    let report = scheduler.run_cycle().await;

    assert_eq!(report.batches.len(), 1);
    assert_eq!(report.paced, Duration::ZERO);
}
