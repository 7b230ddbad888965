//! Leakscan GitHub - code search provider.
//!
//! Wraps `GET /search/code` behind the [`CodeSearch`] trait so the scanner can
//! be driven by the real API or by a test double. A [`ClientFactory`] hands
//! out one client per batch; the GitHub factory rotates over the configured
//! access tokens and refuses to build a client when none are set.
//!
//! # Example
//!
//! ```rust,ignore
//! use leakscan_github::{ClientFactory, GithubClientFactory};
//!
//! let factory = GithubClientFactory::new(config.github.clone());
//! let client = factory.create_client()?;
//! let pages = client.search_code("AKIA in:file").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use client::{ClientFactory, CodeSearch, GithubClient, GithubClientFactory};
pub use error::{GithubError, Result};
pub use types::{CodeSearchPage, Owner, RawMatch, Repository, TextMatch};
