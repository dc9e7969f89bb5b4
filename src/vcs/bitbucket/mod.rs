//! vcs::bitbucket
//!
//! Bitbucket Server (self-hosted) client.
//!
//! # Protocol notes
//!
//! List endpoints use offset pagination: `start`/`limit` query parameters and
//! an `isLastPage` marker in the envelope. An empty page ends the listing even
//! when the marker claims more data, so a server that keeps answering
//! `isLastPage: false` with no values cannot spin the loop. A transport error
//! mid-listing ends the loop and returns what was gathered so far; flaky
//! networks can truncate list results silently, which is accepted for
//! bulk-run resilience.
//!
//! Fork creation is idempotent: the user-namespace fork is looked up at its
//! deterministic name first, and only created on a miss.

pub mod types;

use std::sync::Arc;

use reqwest::Client;

use crate::config::{BitbucketServerSettings, CodeHostSettings};
use crate::http::ClientFactory;
use crate::notify::{NotificationSink, Severity};
use crate::search::SearchResult;

use self::types::{
    BitbucketBranchRef, BitbucketDefaultBranch, BitbucketForkRequest, BitbucketPage,
    BitbucketParticipant, BitbucketProject, BitbucketProjectRequest, BitbucketPullRequest,
    BitbucketRepo, BitbucketUser,
};
use super::wrappers::{BitbucketPullRequestWrapper, BitbucketRepoWrapper};
use super::{expect_success, net, parse_json, PrRole, VcsError};

const PAGE_LIMIT: u64 = 100;

/// Client for one class of code host: Bitbucket Server instances.
pub struct BitbucketServerClient {
    factory: Arc<ClientFactory>,
    notifier: Arc<dyn NotificationSink>,
}

impl BitbucketServerClient {
    pub fn new(factory: Arc<ClientFactory>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { factory, notifier }
    }

    fn client(
        &self,
        search_host: &str,
        code_host: &str,
        settings: &BitbucketServerSettings,
    ) -> Result<Client, VcsError> {
        // TLS override resolution needs the enum-level settings view.
        let wrapped = CodeHostSettings::BitbucketServer(settings.clone());
        Ok(self
            .factory
            .for_code_host(search_host, code_host, &wrapped)?)
    }

    pub async fn get_repo(
        &self,
        repo: &SearchResult,
        settings: &BitbucketServerSettings,
    ) -> Result<BitbucketRepoWrapper, VcsError> {
        let client = self.client(&repo.search_host_name, &repo.code_host_name, settings)?;
        let raw = self.fetch_repo(&client, settings, &repo.project, &repo.repo).await?;
        Ok(BitbucketRepoWrapper {
            search_host: repo.search_host_name.clone(),
            code_host: repo.code_host_name.clone(),
            repo: raw,
        })
    }

    async fn fetch_repo(
        &self,
        client: &Client,
        settings: &BitbucketServerSettings,
        project: &str,
        repo: &str,
    ) -> Result<BitbucketRepo, VcsError> {
        let response = client
            .get(format!(
                "{}/rest/api/1.0/projects/{}/repos/{}",
                settings.base_url, project, repo
            ))
            .send()
            .await
            .map_err(net)?;
        parse_json(response).await
    }

    /// Suggested reviewers for a (source, target) ref pair.
    async fn suggested_reviewers(
        &self,
        client: &Client,
        settings: &BitbucketServerSettings,
        project: &str,
        repo: &str,
        source_repo_id: u64,
        target_repo_id: u64,
        source_ref: &str,
        target_ref: &str,
    ) -> Result<Vec<BitbucketUser>, VcsError> {
        let response = client
            .get(format!(
                "{}/rest/default-reviewers/1.0/projects/{}/repos/{}/reviewers",
                settings.base_url, project, repo
            ))
            .query(&[
                ("sourceRepoId", source_repo_id.to_string()),
                ("targetRepoId", target_repo_id.to_string()),
                ("sourceRefId", source_ref.to_string()),
                ("targetRefId", target_ref.to_string()),
            ])
            .send()
            .await
            .map_err(net)?;
        parse_json(response).await
    }

    /// Union the backend's suggested reviewers into the PR, then update it.
    ///
    /// Existing reviewers are never dropped; the merged set is de-duplicated
    /// by user name.
    pub async fn add_default_reviewers(
        &self,
        settings: &BitbucketServerSettings,
        pull_request: &BitbucketPullRequestWrapper,
    ) -> Result<BitbucketPullRequestWrapper, VcsError> {
        let client = self.client(&pull_request.search_host, &pull_request.code_host, settings)?;
        let pr = &pull_request.pr;
        let suggested = self
            .suggested_reviewers(
                &client,
                settings,
                &pr.to_ref.repository.project.as_ref().map(|p| p.key.clone()).unwrap_or_default(),
                &pr.to_ref.repository.slug,
                pr.from_ref.repository.id.unwrap_or_default(),
                pr.to_ref.repository.id.unwrap_or_default(),
                &pr.from_ref.id,
                &pr.to_ref.id,
            )
            .await?;

        let mut reviewers = pr.reviewers.clone();
        for user in suggested {
            if !reviewers.iter().any(|p| p.user.name == user.name) {
                reviewers.push(BitbucketParticipant { user });
            }
        }
        let mut updated = pr.clone();
        updated.reviewers = reviewers;
        self.put_pr(&client, settings, &pull_request.with_pr(updated))
            .await
    }

    pub async fn create_pr(
        &self,
        title: &str,
        description: &str,
        source_branch: &str,
        settings: &BitbucketServerSettings,
        repo: &SearchResult,
    ) -> Result<BitbucketPullRequestWrapper, VcsError> {
        let client = self.client(&repo.search_host_name, &repo.code_host_name, settings)?;

        let default_branch: BitbucketDefaultBranch = {
            let response = client
                .get(format!(
                    "{}/rest/api/1.0/projects/{}/repos/{}/default-branch",
                    settings.base_url, repo.project, repo.repo
                ))
                .send()
                .await
                .map_err(net)?;
            parse_json(response).await?
        };
        let bb_repo = self.fetch_repo(&client, settings, &repo.project, &repo.repo).await?;
        let repo_id = bb_repo.id.unwrap_or_default();
        let reviewers = self
            .suggested_reviewers(
                &client,
                settings,
                &repo.project,
                &repo.repo,
                repo_id,
                repo_id,
                source_branch,
                &default_branch.id,
            )
            .await?
            .into_iter()
            .map(|user| BitbucketParticipant { user })
            .collect();

        let body = BitbucketPullRequest {
            id: None,
            version: None,
            title: title.to_string(),
            description: Some(description.to_string()),
            from_ref: BitbucketBranchRef {
                id: source_branch.to_string(),
                repository: branch_repo(&repo.project, &repo.repo),
            },
            to_ref: BitbucketBranchRef {
                id: default_branch.id,
                repository: branch_repo(&repo.project, &repo.repo),
            },
            author: None,
            reviewers,
        };
        let response = client
            .post(format!(
                "{}/rest/api/1.0/projects/{}/repos/{}/pull-requests",
                settings.base_url, repo.project, repo.repo
            ))
            .json(&body)
            .send()
            .await
            .map_err(net)?;
        let pr: BitbucketPullRequest = parse_json(response).await?;
        Ok(BitbucketPullRequestWrapper {
            search_host: repo.search_host_name.clone(),
            code_host: repo.code_host_name.clone(),
            pr,
        })
    }

    pub async fn update_pr(
        &self,
        new_title: &str,
        new_description: &str,
        settings: &BitbucketServerSettings,
        pull_request: &BitbucketPullRequestWrapper,
    ) -> Result<BitbucketPullRequestWrapper, VcsError> {
        let client = self.client(&pull_request.search_host, &pull_request.code_host, settings)?;
        let mut pr = pull_request.pr.clone();
        pr.title = new_title.to_string();
        pr.description = Some(new_description.to_string());
        self.put_pr(&client, settings, &pull_request.with_pr(pr)).await
    }

    async fn put_pr(
        &self,
        client: &Client,
        settings: &BitbucketServerSettings,
        pull_request: &BitbucketPullRequestWrapper,
    ) -> Result<BitbucketPullRequestWrapper, VcsError> {
        // The server rejects updates carrying an author block.
        let mut body = pull_request.pr.clone();
        body.author = None;
        let response = client
            .put(format!(
                "{}/rest/api/1.0/projects/{}/repos/{}/pull-requests/{}",
                settings.base_url,
                body.to_ref
                    .repository
                    .project
                    .as_ref()
                    .map(|p| p.key.clone())
                    .unwrap_or_default(),
                body.to_ref.repository.slug,
                body.id.unwrap_or_default(),
            ))
            .json(&body)
            .send()
            .await
            .map_err(net)?;
        let pr: BitbucketPullRequest = parse_json(response).await?;
        Ok(pull_request.with_pr(pr))
    }

    /// All open PRs where the configured user holds the given role.
    ///
    /// Pagination is lenient: a failed page ends the loop with partial data.
    pub async fn get_all_prs(
        &self,
        search_host: &str,
        code_host: &str,
        settings: &BitbucketServerSettings,
        role: PrRole,
    ) -> Result<Vec<BitbucketPullRequestWrapper>, VcsError> {
        let client = self.client(search_host, code_host, settings)?;
        let role = match role {
            PrRole::Author => "AUTHOR",
            PrRole::Reviewer => "REVIEWER",
        };
        let mut collector = Vec::new();
        let mut start = 0u64;
        loop {
            let page: BitbucketPage<BitbucketPullRequest> = {
                let response = client
                    .get(format!(
                        "{}/rest/api/1.0/dashboard/pull-requests",
                        settings.base_url
                    ))
                    .query(&[
                        ("state", "OPEN".to_string()),
                        ("role", role.to_string()),
                        ("start", start.to_string()),
                        ("limit", PAGE_LIMIT.to_string()),
                    ])
                    .send()
                    .await;
                match response {
                    Ok(response) => match parse_json(response).await {
                        Ok(page) => page,
                        Err(e) => {
                            log::warn!("pull request listing stopped early: {}", e);
                            break;
                        }
                    },
                    Err(e) => {
                        log::warn!("pull request listing stopped early: {}", e);
                        break;
                    }
                }
            };
            if let Some(message) = &page.message {
                log::info!("dashboard message: {}", message);
            }
            let values = page.values.unwrap_or_default();
            if values.is_empty() {
                break;
            }
            let count = values.len() as u64;
            collector.extend(values.into_iter().map(|pr| BitbucketPullRequestWrapper {
                search_host: search_host.to_string(),
                code_host: code_host.to_string(),
                pr,
            }));
            if page.is_last_page != Some(false) {
                break;
            }
            start += page.size.unwrap_or(count);
        }
        Ok(collector)
    }

    /// Decline a PR. Best-effort: failures notify instead of propagating.
    ///
    /// With `drop_fork_or_branch`, a source repo living in the configured
    /// user's namespace (a private fork) is deleted afterwards.
    pub async fn close_pr(
        &self,
        drop_fork_or_branch: bool,
        settings: &BitbucketServerSettings,
        pull_request: &BitbucketPullRequestWrapper,
    ) -> Result<BitbucketPullRequestWrapper, VcsError> {
        let client = self.client(&pull_request.search_host, &pull_request.code_host, settings)?;
        let pr = &pull_request.pr;
        let result = async {
            let response = client
                .post(format!(
                    "{}/rest/api/1.0/projects/{}/repos/{}/pull-requests/{}/decline",
                    settings.base_url,
                    pull_request
                        .pr
                        .to_ref
                        .repository
                        .project
                        .as_ref()
                        .map(|p| p.key.clone())
                        .unwrap_or_default(),
                    pr.to_ref.repository.slug,
                    pr.id.unwrap_or_default(),
                ))
                .query(&[("version", pr.version.unwrap_or_default().to_string())])
                .json(&serde_json::json!({}))
                .send()
                .await
                .map_err(net)?;
            expect_success(response).await
        }
        .await;
        if let Err(e) = result {
            log::warn!("failed declining PR: {}", e);
            self.notifier
                .show("Failed declining PR", &e.to_string(), Severity::Error);
            return Ok(pull_request.clone());
        }

        if drop_fork_or_branch {
            let source = &pr.from_ref.repository;
            let in_user_namespace = source
                .project
                .as_ref()
                .map(|p| p.key.starts_with('~'))
                .unwrap_or(false);
            let has_fork_prefix = settings
                .fork_repo_prefix
                .as_deref()
                .map(|prefix| source.slug.starts_with(prefix))
                .unwrap_or(false);
            if in_user_namespace && has_fork_prefix {
                self.delete_user_repo(&client, settings, &source.slug).await;
            }
        }
        Ok(pull_request.clone())
    }

    pub async fn comment_pr(
        &self,
        comment: &str,
        pull_request: &BitbucketPullRequestWrapper,
        settings: &BitbucketServerSettings,
    ) -> Result<(), VcsError> {
        let client = self.client(&pull_request.search_host, &pull_request.code_host, settings)?;
        let pr = &pull_request.pr;
        let result = async {
            let response = client
                .post(format!(
                    "{}/rest/api/1.0/projects/{}/repos/{}/pull-requests/{}/comments",
                    settings.base_url,
                    pr.to_ref
                        .repository
                        .project
                        .as_ref()
                        .map(|p| p.key.clone())
                        .unwrap_or_default(),
                    pr.to_ref.repository.slug,
                    pr.id.unwrap_or_default(),
                ))
                .json(&serde_json::json!({ "text": comment }))
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

    /// Ensure a private fork exists; answer its ssh clone URL.
    ///
    /// Looks up the deterministic fork name first and only forks on a miss,
    /// so a second call never creates a second fork.
    pub async fn create_fork(
        &self,
        settings: &BitbucketServerSettings,
        repo: &SearchResult,
    ) -> Result<Option<String>, VcsError> {
        let client = self.client(&repo.search_host_name, &repo.code_host_name, settings)?;
        let username = settings.username.as_deref().unwrap_or_default();
        let prefix = settings.fork_repo_prefix.as_deref().unwrap_or_default();

        let existing = client
            .get(format!(
                "{}/rest/api/1.0/users/~{}/repos/{}{}",
                settings.base_url, username, prefix, repo.repo
            ))
            .send()
            .await;
        let bb_repo: BitbucketRepo = match existing {
            Ok(response) if response.status().is_success() => parse_json(response).await?,
            _ => {
                // No fork yet.
                let response = client
                    .post(format!(
                        "{}/rest/api/1.0/projects/{}/repos/{}",
                        settings.base_url, repo.project, repo.repo
                    ))
                    .json(&BitbucketForkRequest {
                        slug: format!("{}{}", prefix, repo.repo),
                        project: BitbucketProjectRequest {
                            key: format!("~{}", username),
                        },
                    })
                    .send()
                    .await
                    .map_err(net)?;
                parse_json(response).await?
            }
        };
        Ok(bb_repo.clone_link("ssh").map(str::to_string))
    }

    /// Private forks with no open outgoing PRs, candidates for cleanup.
    pub async fn get_private_fork_repos_without_prs(
        &self,
        search_host: &str,
        code_host: &str,
        settings: &BitbucketServerSettings,
    ) -> Result<Vec<BitbucketRepoWrapper>, VcsError> {
        let client = self.client(search_host, code_host, settings)?;
        let username = settings.username.as_deref().unwrap_or_default();
        let prefix = settings.fork_repo_prefix.as_deref().unwrap_or_default();

        let mut forks = Vec::new();
        let mut start = 0u64;
        loop {
            let response = client
                .get(format!(
                    "{}/rest/api/1.0/users/~{}/repos",
                    settings.base_url, username
                ))
                .query(&[("start", start.to_string()), ("limit", PAGE_LIMIT.to_string())])
                .send()
                .await
                .map_err(net)?;
            let page: BitbucketPage<BitbucketRepo> = parse_json(response).await?;
            let values = page.values.unwrap_or_default();
            if values.is_empty() {
                break;
            }
            let count = values.len() as u64;
            forks.extend(values.into_iter().filter(|r| r.slug.starts_with(prefix)));
            if page.is_last_page != Some(false) {
                break;
            }
            start += page.size.unwrap_or(count);
        }

        let mut stale = Vec::new();
        for fork in forks {
            let project_key = fork
                .project
                .as_ref()
                .map(|p| p.key.clone())
                .unwrap_or_default();
            let response = client
                .get(format!(
                    "{}/rest/api/1.0/projects/{}/repos/{}/pull-requests",
                    settings.base_url, project_key, fork.slug
                ))
                .query(&[("direction", "OUTGOING"), ("state", "OPEN")])
                .send()
                .await
                .map_err(net)?;
            let page: BitbucketPage<BitbucketPullRequest> = parse_json(response).await?;
            if page.size == Some(0) {
                stale.push(BitbucketRepoWrapper {
                    search_host: search_host.to_string(),
                    code_host: code_host.to_string(),
                    repo: fork,
                });
            }
        }
        Ok(stale)
    }

    /// Delete a private fork. Best-effort, notified on failure.
    pub async fn delete_private_repo(
        &self,
        fork: &BitbucketRepoWrapper,
        settings: &BitbucketServerSettings,
    ) -> Result<(), VcsError> {
        let client = self.client(&fork.search_host, &fork.code_host, settings)?;
        self.delete_user_repo(&client, settings, &fork.repo.slug).await;
        Ok(())
    }

    async fn delete_user_repo(
        &self,
        client: &Client,
        settings: &BitbucketServerSettings,
        slug: &str,
    ) {
        let username = settings.username.as_deref().unwrap_or_default();
        let result = async {
            let response = client
                .delete(format!(
                    "{}/rest/api/1.0/users/~{}/repos/{}",
                    settings.base_url, username, slug
                ))
                .send()
                .await
                .map_err(net)?;
            expect_success(response).await
        }
        .await;
        if let Err(e) = result {
            log::warn!("failed deleting repo {}: {}", slug, e);
            self.notifier
                .show("Failed deleting repo", &e.to_string(), Severity::Error);
        }
    }
}

fn branch_repo(project: &str, repo: &str) -> BitbucketRepo {
    BitbucketRepo {
        id: None,
        slug: repo.to_string(),
        project: Some(BitbucketProject {
            key: project.to_string(),
        }),
        links: None,
    }
}
