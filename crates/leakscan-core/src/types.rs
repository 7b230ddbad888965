//! Shared types used across leakscan.
//!
//! This module defines the rule newtypes that flow from the rule store
//! through the scanner into persisted findings.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for rule identifiers.
///
/// Rule IDs are the positive integer primary keys of the `rules` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(i64);

impl RuleId {
    /// Create a new `RuleId`.
    ///
    /// # Errors
    /// Returns error if the ID is not strictly positive.
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id > 0 {
            Ok(Self(id))
        } else {
            Err(ValidationError::InvalidRuleId(id))
        }
    }

    /// Get the inner value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named search pattern, e.g. a credential-leak signature.
///
/// Rules are loaded from the rule store once per scan cycle and are not
/// mutated while the cycle runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Primary key in the rule store
    pub id: RuleId,
    /// Short human-readable name
    pub caption: String,
    /// Query string handed to the search provider
    pub pattern: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Whether the rule takes part in scan cycles
    pub enabled: bool,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.caption)
    }
}
