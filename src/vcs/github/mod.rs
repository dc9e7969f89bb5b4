//! vcs::github
//!
//! github.com client.
//!
//! # Protocol notes
//!
//! Listing the operator's PRs goes through the issue search endpoint
//! (page-numbered pagination), then fetches each referenced PR. Any failure
//! mid-listing degrades to partial results.
//!
//! GitHub has no default-reviewers API; CODEOWNERS assigns reviewers server
//! side on PR creation. `add_default_reviewers` is therefore a notified
//! no-op that returns the PR unchanged.

pub mod types;

use std::sync::Arc;

use reqwest::Client;

use crate::config::{CodeHostSettings, ForkPolicy, GithubComSettings};
use crate::http::ClientFactory;
use crate::notify::{NotificationSink, Severity};
use crate::search::SearchResult;

use self::types::{
    GithubComIssue, GithubComPullRequest, GithubComRepo, GithubComSearchResult,
    GithubPullRequestRequest,
};
use super::wrappers::{GithubComPullRequestWrapper, GithubComRepoWrapper};
use super::{expect_success, net, parse_json, PrRole, VcsError};

const PAGE_SIZE: usize = 100;
const ACCEPT: (&str, &str) = ("Accept", "application/vnd.github.v3+json");

/// Client for one class of code host: github.com.
pub struct GithubComClient {
    factory: Arc<ClientFactory>,
    notifier: Arc<dyn NotificationSink>,
}

impl GithubComClient {
    pub fn new(factory: Arc<ClientFactory>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { factory, notifier }
    }

    fn client(
        &self,
        search_host: &str,
        code_host: &str,
        settings: &GithubComSettings,
    ) -> Result<Client, VcsError> {
        let wrapped = CodeHostSettings::GithubCom(settings.clone());
        Ok(self
            .factory
            .for_code_host(search_host, code_host, &wrapped)?)
    }

    pub async fn get_repo(
        &self,
        repo: &SearchResult,
        settings: &GithubComSettings,
    ) -> Result<GithubComRepoWrapper, VcsError> {
        let client = self.client(&repo.search_host_name, &repo.code_host_name, settings)?;
        let raw = self
            .fetch_repo(&client, settings, &repo.project, &repo.repo)
            .await?;
        Ok(GithubComRepoWrapper {
            search_host: repo.search_host_name.clone(),
            code_host: repo.code_host_name.clone(),
            repo: raw,
        })
    }

    async fn fetch_repo(
        &self,
        client: &Client,
        settings: &GithubComSettings,
        owner: &str,
        repo: &str,
    ) -> Result<GithubComRepo, VcsError> {
        let response = client
            .get(format!("{}/repos/{}/{}", settings.base_url, owner, repo))
            .header(ACCEPT.0, ACCEPT.1)
            .send()
            .await
            .map_err(net)?;
        parse_json(response).await
    }

    pub async fn create_pr(
        &self,
        title: &str,
        description: &str,
        source_branch: &str,
        settings: &GithubComSettings,
        repo: &SearchResult,
    ) -> Result<GithubComPullRequestWrapper, VcsError> {
        let client = self.client(&repo.search_host_name, &repo.code_host_name, settings)?;
        let gh_repo = self
            .fetch_repo(&client, settings, &repo.project, &repo.repo)
            .await?;

        // Direct pushes come from a branch in the same repo; fork policies
        // push from the user's namespace.
        let head = match settings.fork_policy {
            ForkPolicy::PlainBranch => source_branch.to_string(),
            ForkPolicy::LazyFork | ForkPolicy::EagerFork => format!(
                "{}:{}",
                settings.username.as_deref().unwrap_or_default(),
                source_branch
            ),
        };
        let body = GithubPullRequestRequest {
            title: title.to_string(),
            body: description.to_string(),
            draft: false,
            maintainer_can_modify: true,
            head,
            base: gh_repo.default_branch.clone(),
        };
        let response = client
            .post(format!(
                "{}/repos/{}/{}/pulls",
                settings.base_url, repo.project, repo.repo
            ))
            .header(ACCEPT.0, ACCEPT.1)
            .json(&body)
            .send()
            .await
            .map_err(net)?;
        let pr: GithubComPullRequest = parse_json(response).await?;
        Ok(GithubComPullRequestWrapper {
            search_host: repo.search_host_name.clone(),
            code_host: repo.code_host_name.clone(),
            pr,
        })
    }

    pub async fn update_pr(
        &self,
        new_title: &str,
        new_description: &str,
        settings: &GithubComSettings,
        pull_request: &GithubComPullRequestWrapper,
    ) -> Result<GithubComPullRequestWrapper, VcsError> {
        let client = self.client(&pull_request.search_host, &pull_request.code_host, settings)?;
        let response = client
            .patch(&pull_request.pr.url)
            .header(ACCEPT.0, ACCEPT.1)
            .json(&serde_json::json!({
                "title": new_title,
                "body": new_description,
            }))
            .send()
            .await
            .map_err(net)?;
        let pr: GithubComPullRequest = parse_json(response).await?;
        Ok(pull_request.with_pr(pr))
    }

    /// Notified no-op; reviewer defaults are CODEOWNERS territory on GitHub.
    pub async fn add_default_reviewers(
        &self,
        _settings: &GithubComSettings,
        pull_request: &GithubComPullRequestWrapper,
    ) -> Result<GithubComPullRequestWrapper, VcsError> {
        self.notifier.show(
            "Default reviewers not supported",
            "github.com assigns default reviewers through CODEOWNERS; nothing to do client-side",
            Severity::Info,
        );
        Ok(pull_request.clone())
    }

    /// All open PRs where the configured user holds the given role.
    ///
    /// Issue search pages lazily; a failed page or PR fetch degrades to the
    /// results gathered so far.
    pub async fn get_all_prs(
        &self,
        search_host: &str,
        code_host: &str,
        settings: &GithubComSettings,
        role: PrRole,
    ) -> Result<Vec<GithubComPullRequestWrapper>, VcsError> {
        let client = self.client(search_host, code_host, settings)?;
        let username = settings.username.as_deref().unwrap_or_default();
        let query = match role {
            PrRole::Author => format!("is:pr is:open author:{}", username),
            PrRole::Reviewer => format!("is:pr is:open review-requested:{}", username),
        };

        let mut collector = Vec::new();
        let mut page = 1usize;
        loop {
            let envelope: GithubComSearchResult<GithubComIssue> = {
                let response = client
                    .get(format!("{}/search/issues", settings.base_url))
                    .header(ACCEPT.0, ACCEPT.1)
                    .query(&[
                        ("q", query.as_str()),
                        ("per_page", &PAGE_SIZE.to_string()),
                        ("page", &page.to_string()),
                    ])
                    .send()
                    .await;
                match response {
                    Ok(response) => match parse_json(response).await {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            log::warn!("issue search stopped early: {}", e);
                            break;
                        }
                    },
                    Err(e) => {
                        log::warn!("issue search stopped early: {}", e);
                        break;
                    }
                }
            };
            let count = envelope.items.len();
            for issue in envelope.items {
                let Some(url) = issue.pull_request.and_then(|links| links.url) else {
                    continue;
                };
                match self.fetch_pr(&client, &url).await {
                    Ok(pr) => collector.push(GithubComPullRequestWrapper {
                        search_host: search_host.to_string(),
                        code_host: code_host.to_string(),
                        pr,
                    }),
                    Err(e) => log::warn!("failed fetching PR {}: {}", url, e),
                }
            }
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(collector)
    }

    async fn fetch_pr(&self, client: &Client, url: &str) -> Result<GithubComPullRequest, VcsError> {
        let response = client
            .get(url)
            .header(ACCEPT.0, ACCEPT.1)
            .send()
            .await
            .map_err(net)?;
        parse_json(response).await
    }

    /// Close a PR. Best-effort: failures notify instead of propagating.
    ///
    /// With `drop_fork_or_branch`, the source side is cleaned up: a private
    /// fork in the user's namespace is deleted outright, a same-repo branch
    /// is deleted by ref.
    pub async fn close_pr(
        &self,
        drop_fork_or_branch: bool,
        settings: &GithubComSettings,
        pull_request: &GithubComPullRequestWrapper,
    ) -> Result<GithubComPullRequestWrapper, VcsError> {
        let client = self.client(&pull_request.search_host, &pull_request.code_host, settings)?;
        let result = async {
            let response = client
                .patch(&pull_request.pr.url)
                .header(ACCEPT.0, ACCEPT.1)
                .json(&serde_json::json!({ "state": "closed" }))
                .send()
                .await
                .map_err(net)?;
            expect_success(response).await
        }
        .await;
        if let Err(e) = result {
            log::warn!("failed closing PR: {}", e);
            self.notifier
                .show("Failed closing PR", &e.to_string(), Severity::Error);
            return Ok(pull_request.clone());
        }

        if drop_fork_or_branch {
            self.drop_source(&client, settings, pull_request).await;
        }
        Ok(pull_request.clone())
    }

    async fn drop_source(
        &self,
        client: &Client,
        settings: &GithubComSettings,
        pull_request: &GithubComPullRequestWrapper,
    ) {
        let Some(head) = &pull_request.pr.head else {
            return;
        };
        let Some(head_repo) = &head.repo else {
            return;
        };
        let username = settings.username.as_deref().unwrap_or_default();
        let prefix = settings.fork_repo_prefix.as_deref().unwrap_or_default();

        let result = if head_repo.fork
            && head_repo.owner.login == username
            && !prefix.is_empty()
            && head_repo.name.starts_with(prefix)
        {
            self.delete_repo(client, settings, &head_repo.owner.login, &head_repo.name)
                .await
        } else if let Some(branch) = &head.ref_name {
            async {
                let response = client
                    .delete(format!(
                        "{}/repos/{}/git/refs/heads/{}",
                        settings.base_url, head_repo.full_name, branch
                    ))
                    .header(ACCEPT.0, ACCEPT.1)
                    .send()
                    .await
                    .map_err(net)?;
                expect_success(response).await
            }
            .await
        } else {
            Ok(())
        };
        if let Err(e) = result {
            log::warn!("failed dropping PR source: {}", e);
            self.notifier
                .show("Failed dropping PR source", &e.to_string(), Severity::Error);
        }
    }

    pub async fn comment_pr(
        &self,
        comment: &str,
        pull_request: &GithubComPullRequestWrapper,
        settings: &GithubComSettings,
    ) -> Result<(), VcsError> {
        let client = self.client(&pull_request.search_host, &pull_request.code_host, settings)?;
        let (owner, repo) = match pull_request
            .pr
            .base
            .as_ref()
            .and_then(|b| b.repo.as_ref())
        {
            Some(repo) => (repo.owner.login.clone(), repo.name.clone()),
            None => {
                log::warn!("PR without a base repo, skipping comment");
                return Ok(());
            }
        };
        let result = async {
            let response = client
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/comments",
                    settings.base_url, owner, repo, pull_request.pr.number
                ))
                .header(ACCEPT.0, ACCEPT.1)
                .json(&serde_json::json!({ "body": comment }))
                .send()
                .await
                .map_err(net)?;
            expect_success(response).await
        }
        .await;
        if let Err(e) = result {
            log::warn!("failed commenting PR: {}", e);
            self.notifier
                .show("Failed commenting PR", &e.to_string(), Severity::Error);
        }
        Ok(())
    }

    /// Ensure a fork exists in the user's namespace; answer its ssh URL.
    ///
    /// Looks up the deterministic fork name first and only forks on a miss.
    pub async fn create_fork(
        &self,
        settings: &GithubComSettings,
        repo: &SearchResult,
    ) -> Result<Option<String>, VcsError> {
        let client = self.client(&repo.search_host_name, &repo.code_host_name, settings)?;
        let username = settings.username.as_deref().unwrap_or_default();
        let prefix = settings.fork_repo_prefix.as_deref().unwrap_or_default();
        let fork_name = format!("{}{}", prefix, repo.repo);

        let existing = client
            .get(format!(
                "{}/repos/{}/{}",
                settings.base_url, username, fork_name
            ))
            .header(ACCEPT.0, ACCEPT.1)
            .send()
            .await;
        if let Ok(response) = existing {
            if response.status().is_success() {
                let gh_repo: GithubComRepo = parse_json(response).await?;
                return Ok(Some(gh_repo.ssh_url));
            }
        }

        let response = client
            .post(format!(
                "{}/repos/{}/{}/forks",
                settings.base_url, repo.project, repo.repo
            ))
            .header(ACCEPT.0, ACCEPT.1)
            .json(&serde_json::json!({ "name": fork_name, "default_branch_only": false }))
            .send()
            .await
            .map_err(net)?;
        let gh_repo: GithubComRepo = parse_json(response).await?;
        Ok(Some(gh_repo.ssh_url))
    }

    /// Private forks with no open outgoing PRs, candidates for cleanup.
    pub async fn get_private_fork_repos_without_prs(
        &self,
        search_host: &str,
        code_host: &str,
        settings: &GithubComSettings,
    ) -> Result<Vec<GithubComRepoWrapper>, VcsError> {
        let client = self.client(search_host, code_host, settings)?;
        let username = settings.username.as_deref().unwrap_or_default();
        let prefix = settings.fork_repo_prefix.as_deref().unwrap_or_default();

        let mut candidates: Vec<GithubComRepo> = Vec::new();
        let mut page = 1usize;
        loop {
            let response = client
                .get(format!("{}/users/{}/repos", settings.base_url, username))
                .header(ACCEPT.0, ACCEPT.1)
                .query(&[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .map_err(net)?;
            let repos: Vec<GithubComRepo> = parse_json(response).await?;
            let count = repos.len();
            candidates.extend(
                repos
                    .into_iter()
                    .filter(|r| r.fork && !prefix.is_empty() && r.name.starts_with(prefix)),
            );
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        let mut stale = Vec::new();
        for candidate in candidates {
            // The list endpoint omits the parent; fetch the full repo to
            // learn where outgoing PRs would live.
            let full = self
                .fetch_repo(&client, settings, &candidate.owner.login, &candidate.name)
                .await?;
            let Some(parent) = &full.parent else {
                continue;
            };
            let response = client
                .get(format!("{}/search/issues", settings.base_url))
                .header(ACCEPT.0, ACCEPT.1)
                .query(&[(
                    "q",
                    format!("is:pr is:open author:{} repo:{}", username, parent.full_name),
                )])
                .send()
                .await
                .map_err(net)?;
            let envelope: GithubComSearchResult<GithubComIssue> = parse_json(response).await?;
            if envelope.total_count == 0 {
                stale.push(GithubComRepoWrapper {
                    search_host: search_host.to_string(),
                    code_host: code_host.to_string(),
                    repo: full,
                });
            }
        }
        Ok(stale)
    }

    /// Delete a private fork in the user's own namespace. Best-effort.
    pub async fn delete_private_repo(
        &self,
        fork: &GithubComRepoWrapper,
        settings: &GithubComSettings,
    ) -> Result<(), VcsError> {
        let username = settings.username.as_deref().unwrap_or_default();
        if fork.repo.owner.login != username {
            log::warn!(
                "refusing to delete repo outside the user namespace: {}",
                fork.repo.full_name
            );
            return Ok(());
        }
        let client = self.client(&fork.search_host, &fork.code_host, settings)?;
        if let Err(e) = self
            .delete_repo(&client, settings, &fork.repo.owner.login, &fork.repo.name)
            .await
        {
            log::warn!("failed deleting repo {}: {}", fork.repo.full_name, e);
            self.notifier
                .show("Failed deleting repo", &e.to_string(), Severity::Error);
        }
        Ok(())
    }

    async fn delete_repo(
        &self,
        client: &Client,
        settings: &GithubComSettings,
        owner: &str,
        repo: &str,
    ) -> Result<(), VcsError> {
        let response = client
            .delete(format!("{}/repos/{}/{}", settings.base_url, owner, repo))
            .header(ACCEPT.0, ACCEPT.1)
            .send()
            .await
            .map_err(net)?;
        expect_success(response).await
    }
}
