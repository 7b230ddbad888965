use crate::error::Result;
use leakscan_core::{ConfigError, SearchConfig};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Scheduling knobs, validated from the `[search]` configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerSettings {
    /// Rules per batch
    pub batch_size: NonZeroUsize,
    /// Minimum wall-clock time one batch occupies
    pub per_batch_budget: Duration,
    /// Sleep between the end of one cycle and the start of the next
    pub cycle_interval: Duration,
    /// Upper bound on in-flight searches within a batch
    pub max_concurrent_searches: NonZeroUsize,
}

impl ScannerSettings {
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            batch_size: non_zero("search.batch_size", config.batch_size)?,
            per_batch_budget: config.per_batch_budget(),
            cycle_interval: config.cycle_interval(),
            max_concurrent_searches: non_zero(
                "search.max_concurrent_searches",
                config.max_concurrent_searches,
            )?,
        })
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::MIN.saturating_add(24),
            per_batch_budget: Duration::from_secs(60),
            cycle_interval: Duration::from_secs(900),
            max_concurrent_searches: NonZeroUsize::MIN.saturating_add(24),
        }
    }
}

fn non_zero(field: &str, value: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(value).ok_or_else(|| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        }
        .into()
    })
}
