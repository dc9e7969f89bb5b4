//! vcs::github::types
//!
//! Wire types for the github.com REST API (snake_case on the wire). Modeled
//! down to the fields the client actually touches.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubComRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: GithubComUser,
    pub private: bool,
    pub fork: bool,
    pub default_branch: String,
    pub ssh_url: String,
    pub clone_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<GithubComRepo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubComUser {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubComPullRequest {
    pub id: u64,
    pub number: u64,
    pub url: String,
    pub html_url: String,
    pub state: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Source side.
    #[serde(default)]
    pub head: Option<GithubComRef>,
    /// Target side.
    #[serde(default)]
    pub base: Option<GithubComRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubComRef {
    #[serde(default, rename = "ref")]
    pub ref_name: Option<String>,
    #[serde(default)]
    pub repo: Option<GithubComRepo>,
}

/// Envelope of the `search/*` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubComSearchResult<T> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Issue as returned by the issue search endpoint; PRs are issues with a
/// `pull_request` link block.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubComIssue {
    pub id: u64,
    #[serde(default)]
    pub pull_request: Option<GithubComPullRequestLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubComPullRequestLinks {
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of `POST /repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, Serialize)]
pub struct GithubPullRequestRequest {
    pub title: String,
    pub body: String,
    pub draft: bool,
    pub maintainer_can_modify: bool,
    /// `branch` or `owner:branch` for cross-repo PRs.
    pub head: String,
    pub base: String,
}
