//! vcs
//!
//! Code-host clients and the operation router.
//!
//! # Design
//!
//! Every code-host backend implements the same operation set against its own
//! wire protocol; results come back as variant-tagged wrapper values
//! ([`PullRequestWrapper`], [`RepoWrapper`]) that carry the backend payload
//! plus the host names they were resolved under. The [`PrRouter`] owns one
//! client per backend and dispatches each operation by matching the resolved
//! settings variant against the wrapper variant.
//!
//! # Error taxonomy
//!
//! - Configuration-not-found is not an error: router operations answer
//!   `Ok(None)` and warn (debounced).
//! - A settings/wrapper variant mismatch is a routing bug and fails fast as
//!   [`VcsError::ContractViolation`].
//! - Read/list failures mid-pagination degrade to partial results.
//! - Mutating close/delete/comment failures notify the operator and return
//!   without propagating.

pub mod bitbucket;
pub mod github;
mod router;
mod wrappers;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::CodeHostKind;
use crate::http::HttpError;

pub use router::PrRouter;
pub use wrappers::{
    BitbucketPullRequestWrapper, BitbucketRepoWrapper, GithubComPullRequestWrapper,
    GithubComRepoWrapper, PullRequestWrapper, RepoWrapper,
};

/// Which side of a pull request the operator is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrRole {
    Author,
    Reviewer,
}

/// Errors from code-host operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Settings variant does not match the wrapper variant. A routing bug,
    /// never an external-system condition.
    #[error("unable to match config correctly: settings for {settings} but wrapper for {wrapper}")]
    ContractViolation {
        settings: CodeHostKind,
        wrapper: CodeHostKind,
    },

    #[error(transparent)]
    Credentials(#[from] HttpError),

    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(String),

    #[error("unexpected response shape: {0}")]
    Protocol(String),
}

/// Check the status and decode the body.
pub(crate) async fn parse_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, VcsError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(VcsError::Api {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json()
        .await
        .map_err(|e| VcsError::Protocol(e.to_string()))
}

/// Check the status of a response whose body is irrelevant.
pub(crate) async fn expect_success(response: reqwest::Response) -> Result<(), VcsError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(VcsError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}

pub(crate) fn net(e: reqwest::Error) -> VcsError {
    VcsError::Network(e.to_string())
}
