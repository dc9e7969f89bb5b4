//! search
//!
//! Repository search across configured search hosts.
//!
//! # Design
//!
//! Each search backend speaks its own protocol but produces the same value
//! type: [`SearchResult`], a plain identifier for one repository under one
//! configured code host. The [`SearchRouter`] resolves the named search host
//! from settings and dispatches to the client matching the settings variant.
//!
//! An unknown search host is "not configured", not an error: the router
//! warns (debounced) and returns an empty result set.

mod github;
mod sourcegraph;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{SearchHostSettings, SettingsLoader};
use crate::http::HttpError;
use crate::notify::{NotificationSink, Severity};
use crate::util::Debounce;

pub use github::GithubSearchClient;
pub use sourcegraph::SourcegraphSearchClient;

/// One repository found via search.
///
/// Plain value; equality, ordering and hashing use all four fields.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SearchResult {
    pub search_host_name: String,
    pub code_host_name: String,
    pub project: String,
    pub repo: String,
}

impl SearchResult {
    pub fn new(
        search_host_name: impl Into<String>,
        code_host_name: impl Into<String>,
        project: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            search_host_name: search_host_name.into(),
            code_host_name: code_host_name.into(),
            project: project.into(),
            repo: repo.into(),
        }
    }

    /// Relative working-tree location: `search_host/code_host/project/repo`.
    pub fn as_path_string(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.search_host_name, self.code_host_name, self.project, self.repo
        )
    }
}

/// Errors from search backends.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Credentials(#[from] HttpError),

    #[error("search request failed: {0}")]
    Network(String),

    #[error("search backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected search response shape: {0}")]
    Protocol(String),
}

const MISSING_CONFIG_DEBOUNCE: Duration = Duration::from_millis(100);

/// Dispatches searches to the client matching the configured backend.
pub struct SearchRouter {
    loader: Arc<dyn SettingsLoader>,
    sourcegraph: SourcegraphSearchClient,
    github: GithubSearchClient,
    notifier: Arc<dyn NotificationSink>,
    missing_config: Debounce,
}

impl SearchRouter {
    pub fn new(
        loader: Arc<dyn SettingsLoader>,
        sourcegraph: SourcegraphSearchClient,
        github: GithubSearchClient,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            loader,
            sourcegraph,
            github,
            notifier,
            missing_config: Debounce::new(MISSING_CONFIG_DEBOUNCE),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_debounce(mut self, debounce: Debounce) -> Self {
        self.missing_config = debounce;
        self
    }

    /// Run a query against a named search host.
    ///
    /// An unresolved host name yields an empty set, with a debounced warning.
    pub async fn search(
        &self,
        search_host: &str,
        query: &str,
    ) -> Result<BTreeSet<SearchResult>, SearchError> {
        let settings = self
            .loader
            .read_settings()
            .and_then(|s| s.search_hosts.get(search_host).cloned());
        let settings = match settings {
            Some(settings) => settings,
            None => {
                if self.missing_config.should_emit() {
                    self.notifier.show(
                        "Missing config",
                        &format!("No search host configured under name '{}'", search_host),
                        Severity::Warning,
                    );
                }
                return Ok(BTreeSet::new());
            }
        };
        match &settings {
            SearchHostSettings::Sourcegraph(s) => {
                self.sourcegraph.search(search_host, s, query).await
            }
            SearchHostSettings::GithubSearch(s) => {
                self.github.search(search_host, s, query).await
            }
        }
    }

    /// Check that the stored token for a search host is usable.
    pub async fn validate_token(&self, search_host: &str) -> Result<String, SearchError> {
        let settings = self
            .loader
            .read_settings()
            .and_then(|s| s.search_hosts.get(search_host).cloned());
        match settings {
            Some(SearchHostSettings::Sourcegraph(s)) => {
                self.sourcegraph.validate_token(search_host, &s).await
            }
            Some(SearchHostSettings::GithubSearch(s)) => {
                self.github.validate_token(search_host, &s).await
            }
            None => Ok(format!("no search host named '{}'", search_host)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnconfiguredLoader;
    use crate::http::ClientFactory;
    use crate::notify::CollectingNotifier;
    use crate::secrets::MemoryCredentialStore;
    use crate::util::{Clock, ManualClock};
    use std::time::Instant;

    struct SharedClock(Arc<ManualClock>);

    impl Clock for SharedClock {
        fn now(&self) -> Instant {
            self.0.now()
        }
    }

    fn router(notifier: Arc<CollectingNotifier>, debounce: Debounce) -> SearchRouter {
        let loader: Arc<dyn SettingsLoader> = Arc::new(UnconfiguredLoader);
        let factory = Arc::new(ClientFactory::new(
            Arc::clone(&loader),
            Arc::new(MemoryCredentialStore::new()),
            Arc::clone(&notifier) as Arc<dyn NotificationSink>,
        ));
        SearchRouter::new(
            Arc::clone(&loader),
            SourcegraphSearchClient::new(Arc::clone(&factory)),
            GithubSearchClient::new(Arc::clone(&factory)),
            notifier,
        )
        .with_debounce(debounce)
    }

    #[test]
    fn search_result_path_string() {
        let result = SearchResult::new("sourcegraph.com", "github.com", "org", "repo");
        assert_eq!(result.as_path_string(), "sourcegraph.com/github.com/org/repo");
    }

    #[test]
    fn search_results_order_and_dedupe_in_a_set() {
        let mut set = BTreeSet::new();
        set.insert(SearchResult::new("sg", "gh", "b", "x"));
        set.insert(SearchResult::new("sg", "gh", "a", "x"));
        set.insert(SearchResult::new("sg", "gh", "a", "x"));
        let projects: Vec<_> = set.iter().map(|r| r.project.as_str()).collect();
        assert_eq!(projects, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn missing_search_host_warns_once_per_window() {
        let clock = Arc::new(ManualClock::new());
        let debounce = Debounce::with_clock(
            MISSING_CONFIG_DEBOUNCE,
            Box::new(SharedClock(Arc::clone(&clock))),
        );
        let notifier = Arc::new(CollectingNotifier::new());
        let router = router(Arc::clone(&notifier), debounce);

        assert!(router.search("nope", "query").await.unwrap().is_empty());
        assert!(router.search("nope", "query").await.unwrap().is_empty());
        assert_eq!(notifier.titles(), vec!["Missing config"]);

        clock.advance(Duration::from_millis(150));
        assert!(router.search("nope", "query").await.unwrap().is_empty());
        assert_eq!(notifier.titles().len(), 2);
    }
}
