//! Batch planning.
//!
//! The provider throttles aggressive search clients, so a cycle runs its rules
//! in fixed-size batches with a pacing floor between them.

use leakscan_core::Rule;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

/// Rules executed together in one scan sub-cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: usize,
    rules: Vec<Rule>,
}

impl Batch {
    /// Position of this batch within the cycle, starting at 0.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rules in planning order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if the batch holds no rules. Planned batches never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Split `rules` into batches of `batch_size`, preserving order.
///
/// Every batch is full except possibly the last, which holds the remainder.
/// Keys are dense from 0. An empty rule set yields an empty map.
#[must_use]
pub fn plan_batches(rules: Vec<Rule>, batch_size: NonZeroUsize) -> BTreeMap<usize, Batch> {
    let mut batches = BTreeMap::new();
    let mut rules = rules.into_iter().peekable();
    let mut index = 0;

    while rules.peek().is_some() {
        let chunk: Vec<Rule> = rules.by_ref().take(batch_size.get()).collect();
        batches.insert(index, Batch { index, rules: chunk });
        index += 1;
    }

    batches
}
