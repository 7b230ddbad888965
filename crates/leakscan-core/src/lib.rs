//! Leakscan Core - Foundation crate for the leakscan workspace.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other leakscan crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration and validation errors using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes (`RuleId`, `Rule`)
//! - [`rule_file`] - TOML rule file format used to seed the rule store
//!
//! # Example
//!
//! ```rust
//! use leakscan_core::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//! assert_eq!(config.search.batch_size, 25);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod rule_file;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DatabaseConfig, GithubConfig, RulesConfig, SearchConfig};
pub use error::{ConfigError, ConfigResult, ValidationError};
pub use rule_file::{RuleDefinition, RuleFile};
pub use types::{Rule, RuleId};
