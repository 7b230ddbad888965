//! Code search response types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One page of `GET /search/code` results.
///
/// Items stay as raw JSON so that a single malformed hit can be skipped
/// without discarding the rest of the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeSearchPage {
    /// Total hits reported for the query (across all pages)
    pub total_count: u64,
    /// Whether the search timed out before collecting every hit
    #[serde(default)]
    pub incomplete_results: bool,
    /// Raw hit objects
    #[serde(default)]
    pub items: Vec<JsonValue>,
}

impl CodeSearchPage {
    /// Number of hits on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if this page carries no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Decode each hit, yielding an error for hits that don't fit `RawMatch`.
    pub fn matches(&self) -> impl Iterator<Item = Result<RawMatch, serde_json::Error>> + '_ {
        self.items.iter().map(RawMatch::deserialize)
    }
}

/// One code search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMatch {
    /// File name
    pub name: String,
    /// Path within the repository
    pub path: String,
    /// Blob SHA
    pub sha: String,
    /// File web URL
    pub html_url: String,
    /// Repository the file lives in
    pub repository: Repository,
    /// Matched fragments, present with the text-match media type
    #[serde(default)]
    pub text_matches: Vec<TextMatch>,
}

/// Repository metadata attached to a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`
    pub full_name: String,
    /// Repository web URL
    pub html_url: String,
    /// Private repository flag
    #[serde(default)]
    pub private: bool,
    /// Owning account
    #[serde(default)]
    pub owner: Option<Owner>,
}

/// Repository owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Account login
    pub login: String,
}

/// A matched fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    /// Matched property, usually `content`
    #[serde(default)]
    pub property: Option<String>,
    /// Surrounding text
    #[serde(default)]
    pub fragment: String,
}
