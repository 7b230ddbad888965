use crate::error::Result;
use async_trait::async_trait;
use leakscan_core::Rule;
use leakscan_db::Database;
use std::sync::Arc;

/// Where a scan cycle gets its rules from.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Currently enabled rules, in stable order.
    async fn enabled_rules(&self) -> Result<Vec<Rule>>;
}

/// Reads enabled rules from the rule table.
pub struct DbRuleSource {
    db: Arc<Database>,
}

impl DbRuleSource {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleSource for DbRuleSource {
    async fn enabled_rules(&self) -> Result<Vec<Rule>> {
        Ok(leakscan_db::rules::get_enabled_rules(self.db.pool()).await?)
    }
}
