//! vcs::wrappers
//!
//! Variant-tagged wrapper values unifying backend-native payloads.
//!
//! Wrappers are plain values: they carry the backend payload plus the
//! search/code host names they were resolved under, and no live connection.
//! They are never mutated in place; an update produces a new wrapper so an
//! audit trail of instances stays consistent.

use serde::{Deserialize, Serialize};

use crate::config::CodeHostKind;

use super::bitbucket::types::{BitbucketPullRequest, BitbucketRepo};
use super::github::types::{GithubComPullRequest, GithubComRepo};

/// A Bitbucket Server pull request under a configured host pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitbucketPullRequestWrapper {
    pub search_host: String,
    pub code_host: String,
    pub pr: BitbucketPullRequest,
}

impl BitbucketPullRequestWrapper {
    /// Functional update: same hosts, new payload.
    pub fn with_pr(&self, pr: BitbucketPullRequest) -> Self {
        Self {
            search_host: self.search_host.clone(),
            code_host: self.code_host.clone(),
            pr,
        }
    }
}

/// A github.com pull request under a configured host pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubComPullRequestWrapper {
    pub search_host: String,
    pub code_host: String,
    pub pr: GithubComPullRequest,
}

impl GithubComPullRequestWrapper {
    pub fn with_pr(&self, pr: GithubComPullRequest) -> Self {
        Self {
            search_host: self.search_host.clone(),
            code_host: self.code_host.clone(),
            pr,
        }
    }
}

/// One pull request, from whichever backend produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PullRequestWrapper {
    BitbucketServer(BitbucketPullRequestWrapper),
    GithubCom(GithubComPullRequestWrapper),
}

impl PullRequestWrapper {
    pub fn kind(&self) -> CodeHostKind {
        match self {
            PullRequestWrapper::BitbucketServer(_) => CodeHostKind::BitbucketServer,
            PullRequestWrapper::GithubCom(_) => CodeHostKind::GithubCom,
        }
    }

    pub fn search_host_name(&self) -> &str {
        match self {
            PullRequestWrapper::BitbucketServer(w) => &w.search_host,
            PullRequestWrapper::GithubCom(w) => &w.search_host,
        }
    }

    pub fn code_host_name(&self) -> &str {
        match self {
            PullRequestWrapper::BitbucketServer(w) => &w.code_host,
            PullRequestWrapper::GithubCom(w) => &w.code_host,
        }
    }

    /// Project (Bitbucket project key / GitHub owner login).
    pub fn project(&self) -> String {
        match self {
            PullRequestWrapper::BitbucketServer(w) => w
                .pr
                .to_ref
                .repository
                .project
                .as_ref()
                .map(|p| p.key.clone())
                .unwrap_or_default(),
            PullRequestWrapper::GithubCom(w) => w
                .pr
                .base
                .as_ref()
                .and_then(|b| b.repo.as_ref())
                .map(|r| r.owner.login.clone())
                .unwrap_or_default(),
        }
    }

    pub fn repo_slug(&self) -> String {
        match self {
            PullRequestWrapper::BitbucketServer(w) => w.pr.to_ref.repository.slug.clone(),
            PullRequestWrapper::GithubCom(w) => w
                .pr
                .base
                .as_ref()
                .and_then(|b| b.repo.as_ref())
                .map(|r| r.name.clone())
                .unwrap_or_default(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            PullRequestWrapper::BitbucketServer(w) => &w.pr.title,
            PullRequestWrapper::GithubCom(w) => &w.pr.title,
        }
    }

    /// Serializable form for inspection and display.
    pub fn as_raw_json(&self) -> serde_json::Value {
        match self {
            PullRequestWrapper::BitbucketServer(w) => {
                serde_json::to_value(&w.pr).unwrap_or_default()
            }
            PullRequestWrapper::GithubCom(w) => serde_json::to_value(&w.pr).unwrap_or_default(),
        }
    }
}

/// A Bitbucket Server repository under a configured host pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitbucketRepoWrapper {
    pub search_host: String,
    pub code_host: String,
    pub repo: BitbucketRepo,
}

/// A github.com repository under a configured host pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubComRepoWrapper {
    pub search_host: String,
    pub code_host: String,
    pub repo: GithubComRepo,
}

/// One remote repository, from whichever backend produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepoWrapper {
    BitbucketServer(BitbucketRepoWrapper),
    GithubCom(GithubComRepoWrapper),
}

impl RepoWrapper {
    pub fn kind(&self) -> CodeHostKind {
        match self {
            RepoWrapper::BitbucketServer(_) => CodeHostKind::BitbucketServer,
            RepoWrapper::GithubCom(_) => CodeHostKind::GithubCom,
        }
    }

    pub fn search_host_name(&self) -> &str {
        match self {
            RepoWrapper::BitbucketServer(w) => &w.search_host,
            RepoWrapper::GithubCom(w) => &w.search_host,
        }
    }

    pub fn code_host_name(&self) -> &str {
        match self {
            RepoWrapper::BitbucketServer(w) => &w.code_host,
            RepoWrapper::GithubCom(w) => &w.code_host,
        }
    }

    pub fn project(&self) -> String {
        match self {
            RepoWrapper::BitbucketServer(w) => w
                .repo
                .project
                .as_ref()
                .map(|p| p.key.clone())
                .unwrap_or_default(),
            RepoWrapper::GithubCom(w) => w.repo.owner.login.clone(),
        }
    }

    pub fn repo_slug(&self) -> String {
        match self {
            RepoWrapper::BitbucketServer(w) => w.repo.slug.clone(),
            RepoWrapper::GithubCom(w) => w.repo.name.clone(),
        }
    }

    /// SSH clone URL when the backend advertises one.
    pub fn clone_url(&self) -> Option<String> {
        match self {
            RepoWrapper::BitbucketServer(w) => w.repo.clone_link("ssh").map(str::to_string),
            RepoWrapper::GithubCom(w) => Some(w.repo.ssh_url.clone()),
        }
    }

    pub fn as_raw_json(&self) -> serde_json::Value {
        match self {
            RepoWrapper::BitbucketServer(w) => serde_json::to_value(&w.repo).unwrap_or_default(),
            RepoWrapper::GithubCom(w) => serde_json::to_value(&w.repo).unwrap_or_default(),
        }
    }
}
