//! search::github
//!
//! GitHub used as a search host, via the repository search REST API.
//!
//! Pagination is page-numbered (`page=N&per_page=100`). A transport error
//! mid-listing is treated as end-of-results: the pages gathered so far are
//! returned and the failure is logged. Flaky networks can therefore truncate
//! results silently; the lenient behavior is kept on purpose so a bulk run
//! degrades instead of dying.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::GithubSearchSettings;
use crate::http::ClientFactory;

use super::{SearchError, SearchResult};

const PAGE_SIZE: usize = 100;
// The search API refuses to serve past the first thousand results.
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct RepoSearchPage {
    #[serde(default)]
    items: Vec<RepoSearchItem>,
}

#[derive(Debug, Deserialize)]
struct RepoSearchItem {
    name: String,
    owner: RepoOwner,
}

#[derive(Debug, Deserialize)]
struct RepoOwner {
    login: String,
}

/// Search client for the GitHub repository search API.
pub struct GithubSearchClient {
    factory: Arc<ClientFactory>,
}

impl GithubSearchClient {
    pub fn new(factory: Arc<ClientFactory>) -> Self {
        Self { factory }
    }

    /// Run a repository search query, accumulating all pages.
    pub async fn search(
        &self,
        search_host_name: &str,
        settings: &GithubSearchSettings,
        query: &str,
    ) -> Result<BTreeSet<SearchResult>, SearchError> {
        // A GitHub search host fronts exactly one code host entry; results
        // are attributed to it by name.
        let Some(code_host_name) = settings.code_hosts.keys().next() else {
            return Ok(BTreeSet::new());
        };
        let client = self.factory.for_search_host(search_host_name, settings)?;

        let mut results = BTreeSet::new();
        for page in 1..=MAX_PAGES {
            let response = client
                .get(format!("{}/search/repositories", settings.base_url))
                .query(&[
                    ("q", query),
                    ("per_page", &PAGE_SIZE.to_string()),
                    ("page", &page.to_string()),
                ])
                .header("Accept", "application/vnd.github.v3+json")
                .send()
                .await;
            let parsed: Result<RepoSearchPage, String> = match response {
                Ok(response) if response.status().is_success() => {
                    response.json().await.map_err(|e| e.to_string())
                }
                Ok(response) => Err(format!("status {}", response.status())),
                Err(e) => Err(e.to_string()),
            };
            let page_data = match parsed {
                Ok(data) => data,
                Err(reason) => {
                    log::warn!(
                        "repository search page {} failed ({}), returning partial results",
                        page,
                        reason
                    );
                    break;
                }
            };
            let count = page_data.items.len();
            for item in page_data.items {
                results.insert(SearchResult::new(
                    search_host_name,
                    code_host_name.clone(),
                    item.owner.login,
                    item.name,
                ));
            }
            if count < PAGE_SIZE {
                break;
            }
        }
        Ok(results)
    }

    /// Check token validity by fetching the authenticated user.
    pub async fn validate_token(
        &self,
        search_host_name: &str,
        settings: &GithubSearchSettings,
    ) -> Result<String, SearchError> {
        let client = self.factory.for_search_host(search_host_name, settings)?;
        let response = client
            .get(format!("{}/user", settings.base_url))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;
        if response.status().is_success() {
            Ok("OK".to_string())
        } else {
            Ok(format!("token rejected with status {}", response.status()))
        }
    }
}
