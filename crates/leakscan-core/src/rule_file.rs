//! TOML rule file format.
//!
//! A rule file seeds the rule store at startup:
//!
//! ```toml
//! [[rules]]
//! caption = "aws-access-key"
//! pattern = "AKIA in:file"
//! description = "AWS access key IDs"
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level rule file document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    /// Rule definitions in file order
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// One rule as written in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique caption, used as the upsert key
    pub caption: String,
    /// Search query
    pub pattern: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to enabled when omitted
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RuleFile {
    /// Read and validate a rule file from disk.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading rules from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate rule file contents.
    pub fn parse(contents: &str) -> ConfigResult<Self> {
        let file: Self = toml::from_str(contents)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.caption.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("rules[{index}].caption"),
                    reason: "must not be empty".to_string(),
                });
            }
            if rule.pattern.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("rules[{index}].pattern"),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}
