//! Leakscan Scanner - scan scheduling and result ingestion.
//!
//! Periodically runs every enabled rule as a GitHub code search and persists
//! the hits, deduplicated by repository, path and blob SHA.
//!
//! # Architecture
//!
//! - [`ScanScheduler`] loads rules, plans them into batches and paces the
//!   batches so each occupies a minimum time budget
//! - [`plan_batches`] splits rules into fixed-size batches
//! - [`BatchExecutor`] runs a batch's searches concurrently over one client
//! - [`ResultIngestor`] stores each hit and registers its repository
//! - [`ExtensionFilter`] flags boilerplate file types as low priority
//! - [`RepoBackfill`] promotes discovered repositories after each cycle
//!
//! # Example
//!
//! ```rust,ignore
//! use leakscan_scanner::*;
//!
//! let ingestor = Arc::new(ResultIngestor::new(db.clone(), ExtensionFilter::from_config(&config.search)));
//! let executor = BatchExecutor::new(factory, ingestor, settings.max_concurrent_searches);
//! let scheduler = ScanScheduler::new(rules, executor, backfill, settings).with_cycle_store(db);
//! scheduler.run().await;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod backfill;
pub mod error;
pub mod executor;
pub mod filter;
pub mod ingest;
pub mod planner;
pub mod rules;
pub mod scheduler;
pub mod settings;

pub use backfill::{Backfill, BackfillReport, RepoBackfill};
pub use error::{Result, ScanError};
pub use executor::{BatchExecutor, BatchReport};
pub use filter::ExtensionFilter;
pub use ingest::{IngestReport, ResultIngestor};
pub use planner::{plan_batches, Batch};
pub use rules::{DbRuleSource, RuleSource};
pub use scheduler::{pacing_delay, CycleOutcome, CycleReport, ScanScheduler};
pub use settings::ScannerSettings;
