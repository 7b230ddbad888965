//! GitHub code search client.

use crate::error::{GithubError, Result};
use crate::types::CodeSearchPage;
use async_trait::async_trait;
use leakscan_core::GithubConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Media type that adds `text_matches` fragments to each hit.
const TEXT_MATCH_MEDIA_TYPE: &str = "application/vnd.github.text-match+json";

/// REST API version pinned on every request.
const API_VERSION: &str = "2022-11-28";

/// Something that can run a code search query.
///
/// Implementations must be thread-safe: one client is shared by every
/// concurrent search of a batch.
#[async_trait]
pub trait CodeSearch: Send + Sync {
    /// Run `pattern` and return every fetched result page.
    ///
    /// # Errors
    /// Returns error if any page request fails or cannot be decoded.
    async fn search_code(&self, pattern: &str) -> Result<Vec<CodeSearchPage>>;
}

/// Hands out search clients, one per batch.
pub trait ClientFactory: Send + Sync {
    /// Create a client.
    ///
    /// # Errors
    /// Returns `GithubError::MissingToken` if no credential is available, or
    /// `GithubError::Client` if the HTTP client cannot be built.
    fn create_client(&self) -> Result<Arc<dyn CodeSearch>>;
}

/// Code search over the GitHub REST API.
pub struct GithubClient {
    client: Client,
    api_url: String,
    token: String,
    per_page: u32,
    max_pages: u32,
}

impl GithubClient {
    /// Create a client for one access token.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &GithubConfig, token: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(TEXT_MATCH_MEDIA_TYPE));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| GithubError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            per_page: config.per_page,
            max_pages: config.max_pages,
        })
    }

    /// Fetch one page of results.
    async fn fetch_page(&self, pattern: &str, page: u32) -> Result<CodeSearchPage> {
        let response = self
            .client
            .get(format!("{}/search/code", self.api_url))
            .bearer_auth(&self.token)
            .query(&search_query(pattern, self.per_page, page))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let rate_limit_exhausted = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0");
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GithubError::from_status(
                status.as_u16(),
                rate_limit_exhausted,
                error_text,
            ));
        }

        let body = response.text().await?;
        let page: CodeSearchPage = serde_json::from_str(&body)?;
        Ok(page)
    }
}

#[async_trait]
impl CodeSearch for GithubClient {
    async fn search_code(&self, pattern: &str) -> Result<Vec<CodeSearchPage>> {
        let mut pages = Vec::new();
        let mut collected: u64 = 0;

        for page_number in 1..=self.max_pages {
            let page = self.fetch_page(pattern, page_number).await?;
            let page_len = page.len();
            collected += page_len as u64;
            let total = page.total_count;

            if page.incomplete_results {
                tracing::debug!("Search for {:?} returned incomplete results", pattern);
            }
            pages.push(page);

            if !has_more_pages(page_len, collected, total, self.per_page) {
                break;
            }
        }

        Ok(pages)
    }
}

/// Query parameters for one page of a code search.
fn search_query(pattern: &str, per_page: u32, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("q", pattern.to_string()),
        ("sort", "indexed".to_string()),
        ("order", "desc".to_string()),
        ("per_page", per_page.to_string()),
        ("page", page.to_string()),
    ]
}

/// Whether another page could hold further hits.
fn has_more_pages(page_len: usize, collected: u64, total: u64, per_page: u32) -> bool {
    page_len > 0 && page_len as u64 >= u64::from(per_page) && collected < total
}

/// Creates `GithubClient`s, rotating round-robin over the configured tokens.
pub struct GithubClientFactory {
    config: GithubConfig,
    next_token: AtomicUsize,
}

impl GithubClientFactory {
    /// Create a factory from the `[github]` configuration section.
    #[must_use]
    pub fn new(config: GithubConfig) -> Self {
        Self {
            config,
            next_token: AtomicUsize::new(0),
        }
    }

    fn next_token(&self) -> Option<&str> {
        let tokens = &self.config.tokens;
        if tokens.is_empty() {
            return None;
        }
        let index = self.next_token.fetch_add(1, Ordering::Relaxed) % tokens.len();
        Some(tokens[index].as_str())
    }
}

impl ClientFactory for GithubClientFactory {
    fn create_client(&self) -> Result<Arc<dyn CodeSearch>> {
        let token = self
            .next_token()
            .filter(|token| !token.trim().is_empty())
            .ok_or(GithubError::MissingToken)?;
        let client = GithubClient::new(&self.config, token)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_tokens(tokens: &[&str]) -> GithubConfig {
        GithubConfig {
            tokens: tokens.iter().map(ToString::to_string).collect(),
            ..GithubConfig::default()
        }
    }

    #[test]
    fn test_search_query_parameters() {
        let query = search_query("AKIA in:file", 100, 2);
        assert_eq!(query[0], ("q", "AKIA in:file".to_string()));
        assert!(query.contains(&("sort", "indexed".to_string())));
        assert!(query.contains(&("per_page", "100".to_string())));
        assert!(query.contains(&("page", "2".to_string())));
    }

    #[test]
    fn test_has_more_pages() {
        // Full page with more hits pending
        assert!(has_more_pages(100, 100, 250, 100));
        // Short page means the result set is exhausted
        assert!(!has_more_pages(50, 150, 250, 100));
        // Everything collected
        assert!(!has_more_pages(100, 200, 200, 100));
        // Empty page
        assert!(!has_more_pages(0, 0, 10, 100));
    }

    #[test]
    fn test_factory_without_tokens() {
        let factory = GithubClientFactory::new(config_with_tokens(&[]));
        let result = factory.create_client();
        assert!(matches!(result, Err(GithubError::MissingToken)));
    }

    #[test]
    fn test_factory_rejects_blank_token() {
        let factory = GithubClientFactory::new(config_with_tokens(&["  "]));
        assert!(matches!(
            factory.create_client(),
            Err(GithubError::MissingToken)
        ));
    }

    #[test]
    fn test_factory_rotates_tokens() {
        let factory = GithubClientFactory::new(config_with_tokens(&["a", "b"]));
        assert_eq!(factory.next_token(), Some("a"));
        assert_eq!(factory.next_token(), Some("b"));
        assert_eq!(factory.next_token(), Some("a"));
    }

    #[tokio::test]
    async fn test_factory_builds_client() {
        let factory = GithubClientFactory::new(config_with_tokens(&["ghp_test"]));
        assert!(factory.create_client().is_ok());
    }

    #[test]
    fn test_client_trims_api_url() {
        let config = GithubConfig {
            api_url: "https://ghe.example.com/api/v3/".to_string(),
            ..GithubConfig::default()
        };
        let client = GithubClient::new(&config, "token").expect("build client");
        assert_eq!(client.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(client.per_page, 100);
    }
}
