//! vcs::router
//!
//! Dispatches PR and repo operations to the backend matching the resolved
//! settings variant.
//!
//! # Outcomes
//!
//! Operations distinguish three outcomes. `Ok(Some(_))` is a backend answer.
//! `Ok(None)` means the (search host, code host) pair has no configuration;
//! the router warns (debounced to one warning per 100ms) and the caller
//! treats the operation as skipped. `Err(VcsError::ContractViolation)` means
//! the resolved settings variant does not match the wrapper variant, which
//! is a routing bug and fails fast.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{CodeHostSettings, SettingsLoader};
use crate::notify::{NotificationSink, Severity};
use crate::search::SearchResult;
use crate::util::Debounce;

use super::bitbucket::BitbucketServerClient;
use super::github::GithubComClient;
use super::wrappers::{PullRequestWrapper, RepoWrapper};
use super::{PrRole, VcsError};

const MISSING_CONFIG_DEBOUNCE: Duration = Duration::from_millis(100);

/// One router per composition; holds one client per backend.
pub struct PrRouter {
    loader: Arc<dyn SettingsLoader>,
    bitbucket: BitbucketServerClient,
    github: GithubComClient,
    notifier: Arc<dyn NotificationSink>,
    missing_config: Debounce,
}

impl PrRouter {
    pub fn new(
        loader: Arc<dyn SettingsLoader>,
        bitbucket: BitbucketServerClient,
        github: GithubComClient,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            loader,
            bitbucket,
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

    /// Settings for a host pair, or `None` with a debounced warning.
    ///
    /// Repeated calls against unchanged settings answer value-equal results.
    pub fn resolve(&self, search_host: &str, code_host: &str) -> Option<CodeHostSettings> {
        let resolved = self
            .loader
            .read_settings()
            .and_then(|s| s.resolve_code_host(search_host, code_host).cloned());
        if resolved.is_none() && self.missing_config.should_emit() {
            self.notifier.show(
                "Missing config",
                &format!(
                    "Failed finding config for '{}'/'{}'",
                    search_host, code_host
                ),
                Severity::Warning,
            );
        }
        resolved
    }

    pub async fn create_pr(
        &self,
        title: &str,
        description: &str,
        source_branch: &str,
        repo: &SearchResult,
    ) -> Result<Option<PullRequestWrapper>, VcsError> {
        match self.resolve(&repo.search_host_name, &repo.code_host_name) {
            Some(CodeHostSettings::BitbucketServer(settings)) => Ok(Some(
                PullRequestWrapper::BitbucketServer(
                    self.bitbucket
                        .create_pr(title, description, source_branch, &settings, repo)
                        .await?,
                ),
            )),
            Some(CodeHostSettings::GithubCom(settings)) => Ok(Some(
                PullRequestWrapper::GithubCom(
                    self.github
                        .create_pr(title, description, source_branch, &settings, repo)
                        .await?,
                ),
            )),
            None => Ok(None),
        }
    }

    pub async fn update_pr(
        &self,
        new_title: &str,
        new_description: &str,
        pull_request: &PullRequestWrapper,
    ) -> Result<Option<PullRequestWrapper>, VcsError> {
        let settings = self.resolve(
            pull_request.search_host_name(),
            pull_request.code_host_name(),
        );
        match (settings, pull_request) {
            (
                Some(CodeHostSettings::BitbucketServer(settings)),
                PullRequestWrapper::BitbucketServer(pr),
            ) => Ok(Some(PullRequestWrapper::BitbucketServer(
                self.bitbucket
                    .update_pr(new_title, new_description, &settings, pr)
                    .await?,
            ))),
            (Some(CodeHostSettings::GithubCom(settings)), PullRequestWrapper::GithubCom(pr)) => {
                Ok(Some(PullRequestWrapper::GithubCom(
                    self.github
                        .update_pr(new_title, new_description, &settings, pr)
                        .await?,
                )))
            }
            (None, _) => Ok(None),
            (Some(settings), wrapper) => Err(VcsError::ContractViolation {
                settings: settings.kind(),
                wrapper: wrapper.kind(),
            }),
        }
    }

    pub async fn add_default_reviewers(
        &self,
        pull_request: &PullRequestWrapper,
    ) -> Result<Option<PullRequestWrapper>, VcsError> {
        let settings = self.resolve(
            pull_request.search_host_name(),
            pull_request.code_host_name(),
        );
        match (settings, pull_request) {
            (
                Some(CodeHostSettings::BitbucketServer(settings)),
                PullRequestWrapper::BitbucketServer(pr),
            ) => Ok(Some(PullRequestWrapper::BitbucketServer(
                self.bitbucket.add_default_reviewers(&settings, pr).await?,
            ))),
            (Some(CodeHostSettings::GithubCom(settings)), PullRequestWrapper::GithubCom(pr)) => {
                Ok(Some(PullRequestWrapper::GithubCom(
                    self.github.add_default_reviewers(&settings, pr).await?,
                )))
            }
            (None, _) => Ok(None),
            (Some(settings), wrapper) => Err(VcsError::ContractViolation {
                settings: settings.kind(),
                wrapper: wrapper.kind(),
            }),
        }
    }

    /// All open PRs under a host pair where the user holds `role`.
    pub async fn get_all_prs(
        &self,
        search_host: &str,
        code_host: &str,
        role: PrRole,
    ) -> Result<Option<Vec<PullRequestWrapper>>, VcsError> {
        match self.resolve(search_host, code_host) {
            Some(CodeHostSettings::BitbucketServer(settings)) => Ok(Some(
                self.bitbucket
                    .get_all_prs(search_host, code_host, &settings, role)
                    .await?
                    .into_iter()
                    .map(PullRequestWrapper::BitbucketServer)
                    .collect(),
            )),
            Some(CodeHostSettings::GithubCom(settings)) => Ok(Some(
                self.github
                    .get_all_prs(search_host, code_host, &settings, role)
                    .await?
                    .into_iter()
                    .map(PullRequestWrapper::GithubCom)
                    .collect(),
            )),
            None => Ok(None),
        }
    }

    pub async fn close_pr(
        &self,
        drop_fork_or_branch: bool,
        pull_request: &PullRequestWrapper,
    ) -> Result<Option<PullRequestWrapper>, VcsError> {
        let settings = self.resolve(
            pull_request.search_host_name(),
            pull_request.code_host_name(),
        );
        match (settings, pull_request) {
            (
                Some(CodeHostSettings::BitbucketServer(settings)),
                PullRequestWrapper::BitbucketServer(pr),
            ) => Ok(Some(PullRequestWrapper::BitbucketServer(
                self.bitbucket
                    .close_pr(drop_fork_or_branch, &settings, pr)
                    .await?,
            ))),
            (Some(CodeHostSettings::GithubCom(settings)), PullRequestWrapper::GithubCom(pr)) => {
                Ok(Some(PullRequestWrapper::GithubCom(
                    self.github
                        .close_pr(drop_fork_or_branch, &settings, pr)
                        .await?,
                )))
            }
            (None, _) => Ok(None),
            (Some(settings), wrapper) => Err(VcsError::ContractViolation {
                settings: settings.kind(),
                wrapper: wrapper.kind(),
            }),
        }
    }

    pub async fn comment_pr(
        &self,
        comment: &str,
        pull_request: &PullRequestWrapper,
    ) -> Result<(), VcsError> {
        let settings = self.resolve(
            pull_request.search_host_name(),
            pull_request.code_host_name(),
        );
        match (settings, pull_request) {
            (
                Some(CodeHostSettings::BitbucketServer(settings)),
                PullRequestWrapper::BitbucketServer(pr),
            ) => self.bitbucket.comment_pr(comment, pr, &settings).await,
            (Some(CodeHostSettings::GithubCom(settings)), PullRequestWrapper::GithubCom(pr)) => {
                self.github.comment_pr(comment, pr, &settings).await
            }
            (None, _) => Ok(()),
            (Some(settings), wrapper) => Err(VcsError::ContractViolation {
                settings: settings.kind(),
                wrapper: wrapper.kind(),
            }),
        }
    }

    /// Ensure a fork exists; answer its ssh clone URL.
    pub async fn create_fork(&self, repo: &SearchResult) -> Result<Option<String>, VcsError> {
        match self.resolve(&repo.search_host_name, &repo.code_host_name) {
            Some(CodeHostSettings::BitbucketServer(settings)) => {
                self.bitbucket.create_fork(&settings, repo).await
            }
            Some(CodeHostSettings::GithubCom(settings)) => {
                self.github.create_fork(&settings, repo).await
            }
            None => Ok(None),
        }
    }

    pub async fn get_private_fork_repos_without_prs(
        &self,
        search_host: &str,
        code_host: &str,
    ) -> Result<Option<Vec<RepoWrapper>>, VcsError> {
        match self.resolve(search_host, code_host) {
            Some(CodeHostSettings::BitbucketServer(settings)) => Ok(Some(
                self.bitbucket
                    .get_private_fork_repos_without_prs(search_host, code_host, &settings)
                    .await?
                    .into_iter()
                    .map(RepoWrapper::BitbucketServer)
                    .collect(),
            )),
            Some(CodeHostSettings::GithubCom(settings)) => Ok(Some(
                self.github
                    .get_private_fork_repos_without_prs(search_host, code_host, &settings)
                    .await?
                    .into_iter()
                    .map(RepoWrapper::GithubCom)
                    .collect(),
            )),
            None => Ok(None),
        }
    }

    pub async fn delete_private_repo(&self, fork: &RepoWrapper) -> Result<(), VcsError> {
        let settings = self.resolve(fork.search_host_name(), fork.code_host_name());
        match (settings, fork) {
            (
                Some(CodeHostSettings::BitbucketServer(settings)),
                RepoWrapper::BitbucketServer(fork),
            ) => self.bitbucket.delete_private_repo(fork, &settings).await,
            (Some(CodeHostSettings::GithubCom(settings)), RepoWrapper::GithubCom(fork)) => {
                self.github.delete_private_repo(fork, &settings).await
            }
            (None, _) => Ok(()),
            (Some(settings), wrapper) => Err(VcsError::ContractViolation {
                settings: settings.kind(),
                wrapper: wrapper.kind(),
            }),
        }
    }

    pub async fn get_repo(
        &self,
        search_result: &SearchResult,
    ) -> Result<Option<RepoWrapper>, VcsError> {
        match self.resolve(
            &search_result.search_host_name,
            &search_result.code_host_name,
        ) {
            Some(CodeHostSettings::BitbucketServer(settings)) => Ok(Some(
                RepoWrapper::BitbucketServer(
                    self.bitbucket.get_repo(search_result, &settings).await?,
                ),
            )),
            Some(CodeHostSettings::GithubCom(settings)) => Ok(Some(RepoWrapper::GithubCom(
                self.github.get_repo(search_result, &settings).await?,
            ))),
            None => Ok(None),
        }
    }
}
