//! search::sourcegraph
//!
//! Sourcegraph search backend.
//!
//! Talks to the GraphQL endpoint at `{base_url}/.api/graphql`. Query syntax
//! is the operator's business and passed through verbatim; this client only
//! cares about the repository names in the response, which Sourcegraph
//! returns as `code-host/project/repo`.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::config::SourcegraphSettings;
use crate::http::ClientFactory;

use super::{SearchError, SearchResult};

const SEARCH_QUERY: &str = "\
query ($query: String!) {
  search(query: $query, version: V2) {
    results {
      results {
        __typename
        ... on FileMatch { repository { name } }
        ... on Repository { name }
        ... on CommitSearchResult { commit { repository { name } } }
      }
    }
  }
}";

const CURRENT_USER_QUERY: &str = "query { currentUser { username } }";

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchNode,
}

#[derive(Debug, Deserialize)]
struct SearchNode {
    results: ResultsNode,
}

#[derive(Debug, Deserialize)]
struct ResultsNode {
    results: Vec<MatchNode>,
}

#[derive(Debug, Deserialize)]
struct MatchNode {
    #[serde(default)]
    repository: Option<RepositoryNode>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    commit: Option<CommitNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    repository: RepositoryNode,
}

impl MatchNode {
    fn repo_name(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .map(|r| r.name.as_str())
            .or(self.name.as_deref())
            .or_else(|| self.commit.as_ref().map(|c| c.repository.name.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct CurrentUserData {
    #[serde(rename = "currentUser")]
    current_user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    username: String,
}

/// Search client for Sourcegraph instances.
pub struct SourcegraphSearchClient {
    factory: Arc<ClientFactory>,
}

impl SourcegraphSearchClient {
    pub fn new(factory: Arc<ClientFactory>) -> Self {
        Self { factory }
    }

    /// Run a raw Sourcegraph query, returning the matched repositories.
    ///
    /// Repository names that do not split into `code-host/project/repo` are
    /// logged and skipped.
    pub async fn search(
        &self,
        search_host_name: &str,
        settings: &SourcegraphSettings,
        query: &str,
    ) -> Result<BTreeSet<SearchResult>, SearchError> {
        let envelope: GraphQlEnvelope<SearchData> = self
            .graphql(
                search_host_name,
                settings,
                SEARCH_QUERY,
                json!({ "query": query }),
            )
            .await?;
        let data = graphql_data(envelope)?;

        let mut results = BTreeSet::new();
        for node in &data.search.results.results {
            let Some(name) = node.repo_name() else {
                log::warn!("search match without a repository name, skipping");
                continue;
            };
            let mut parts = name.splitn(3, '/');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(code_host), Some(project), Some(repo)) => {
                    results.insert(SearchResult::new(
                        search_host_name,
                        code_host,
                        project,
                        repo,
                    ));
                }
                _ => {
                    log::warn!("unparsable repository name '{}', skipping", name);
                }
            }
        }
        Ok(results)
    }

    /// Check token validity by asking for the current user.
    pub async fn validate_token(
        &self,
        search_host_name: &str,
        settings: &SourcegraphSettings,
    ) -> Result<String, SearchError> {
        let envelope: GraphQlEnvelope<CurrentUserData> = self
            .graphql(search_host_name, settings, CURRENT_USER_QUERY, json!({}))
            .await?;
        let data = graphql_data(envelope)?;
        match data.current_user {
            Some(user) if !user.username.is_empty() => Ok("OK".to_string()),
            _ => Ok("token not recognized".to_string()),
        }
    }

    async fn graphql<T: serde::de::DeserializeOwned>(
        &self,
        search_host_name: &str,
        settings: &SourcegraphSettings,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlEnvelope<T>, SearchError> {
        let client = self.factory.for_search_host(search_host_name, settings)?;
        let response = client
            .post(format!("{}/.api/graphql", settings.base_url))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| SearchError::Protocol(e.to_string()))
    }
}

fn graphql_data<T>(envelope: GraphQlEnvelope<T>) -> Result<T, SearchError> {
    if let Some(error) = envelope.errors.first() {
        return Err(SearchError::Protocol(error.message.clone()));
    }
    envelope
        .data
        .ok_or_else(|| SearchError::Protocol("response without data".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_node_prefers_direct_repository() {
        let node: MatchNode = serde_json::from_value(json!({
            "__typename": "FileMatch",
            "repository": { "name": "github.com/org/repo" }
        }))
        .unwrap();
        assert_eq!(node.repo_name(), Some("github.com/org/repo"));
    }

    #[test]
    fn match_node_falls_back_to_commit_repository() {
        let node: MatchNode = serde_json::from_value(json!({
            "__typename": "CommitSearchResult",
            "commit": { "repository": { "name": "github.com/org/other" } }
        }))
        .unwrap();
        assert_eq!(node.repo_name(), Some("github.com/org/other"));
    }

    #[test]
    fn graphql_errors_take_precedence_over_data() {
        let envelope: GraphQlEnvelope<CurrentUserData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "query too deep" }]
        }))
        .unwrap();
        let err = graphql_data(envelope).unwrap_err();
        assert!(matches!(err, SearchError::Protocol(m) if m == "query too deep"));
    }
}
