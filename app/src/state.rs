//! Application state.

use anyhow::Context;
use leakscan_core::{AppConfig, RuleFile};
use leakscan_db::Database;
use leakscan_github::GithubClientFactory;
use leakscan_scanner::{
    BatchExecutor, DbRuleSource, ExtensionFilter, RepoBackfill, ResultIngestor, ScanScheduler,
    ScannerSettings,
};
use std::path::Path;
use std::sync::Arc;

/// Long-lived handles shared by the scan loop.
pub struct AppState {
    pub config: AppConfig,
    pub db: Arc<Database>,
}

impl AppState {
    /// Open the database named by `config` and bring its schema up to date.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let db_path = config.database_path()?;
        let db = Database::new(&db_path, config.database.max_connections)
            .await
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        db.run_migrations().await.context("failed to run migrations")?;

        tracing::info!("Database ready at {}", db_path.display());

        Ok(Self {
            config,
            db: Arc::new(db),
        })
    }

    /// Import the configured rule file, if any. Returns the number of rules read.
    pub async fn import_configured_rules(&self) -> anyhow::Result<usize> {
        match &self.config.rules.file {
            Some(path) => import_rules(&self.db, path).await,
            None => Ok(0),
        }
    }

    /// Wire the scan pipeline from configuration.
    pub fn scheduler(&self) -> anyhow::Result<ScanScheduler> {
        let settings = ScannerSettings::from_config(&self.config.search)?;

        if self.config.github.tokens.is_empty() {
            tracing::warn!("No GitHub access token configured, every batch will be skipped");
        }

        let factory = Arc::new(GithubClientFactory::new(self.config.github.clone()));
        let ingestor = Arc::new(ResultIngestor::new(
            Arc::clone(&self.db),
            ExtensionFilter::from_config(&self.config.search),
        ));
        let executor = BatchExecutor::new(factory, ingestor, settings.max_concurrent_searches);

        Ok(ScanScheduler::new(
            Arc::new(DbRuleSource::new(Arc::clone(&self.db))),
            executor,
            Arc::new(RepoBackfill::new(Arc::clone(&self.db))),
            settings,
        )
        .with_cycle_store(Arc::clone(&self.db)))
    }
}

/// Upsert every rule in a TOML rule file, keyed by caption.
pub async fn import_rules(db: &Database, path: &Path) -> anyhow::Result<usize> {
    let file = RuleFile::load(path)
        .with_context(|| format!("failed to load rule file {}", path.display()))?;

    for definition in &file.rules {
        leakscan_db::rules::upsert_rule(db.pool(), definition)
            .await
            .with_context(|| format!("failed to import rule '{}'", definition.caption))?;
    }

    tracing::info!("Imported {} rules from {}", file.rules.len(), path.display());
    Ok(file.rules.len())
}
