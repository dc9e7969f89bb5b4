//! vcs::bitbucket::types
//!
//! Wire types for the Bitbucket Server REST API (camelCase on the wire).
//! Only the fields the client reads or writes are modeled; everything else
//! passes through untouched because serde ignores unknown fields.

use serde::{Deserialize, Serialize};

/// Offset-paginated envelope used by every Bitbucket list endpoint.
///
/// All fields are `Option` so a missing field deserializes as `None` without
/// imposing bounds on the payload type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketPage<T> {
    pub size: Option<u64>,
    pub is_last_page: Option<bool>,
    pub values: Option<Vec<T>>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketPullRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub from_ref: BitbucketBranchRef,
    pub to_ref: BitbucketBranchRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<BitbucketParticipant>,
    #[serde(default)]
    pub reviewers: Vec<BitbucketParticipant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketBranchRef {
    /// Fully qualified or short ref, e.g. `refs/heads/main`.
    pub id: String,
    pub repository: BitbucketRepo,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketRepo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<BitbucketProject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<BitbucketLinks>,
}

impl BitbucketRepo {
    /// Clone link for a protocol name (`ssh` or `http`).
    pub fn clone_link(&self, protocol: &str) -> Option<&str> {
        self.links
            .as_ref()?
            .clone
            .iter()
            .find(|link| link.name == protocol)
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitbucketProject {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitbucketLinks {
    #[serde(default)]
    pub clone: Vec<BitbucketCloneLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitbucketCloneLink {
    pub name: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitbucketParticipant {
    pub user: BitbucketUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitbucketUser {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketDefaultBranch {
    /// Fully qualified ref, e.g. `refs/heads/main`.
    pub id: String,
    #[serde(default, rename = "displayId")]
    pub display_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BitbucketForkRequest {
    pub slug: String,
    pub project: BitbucketProjectRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct BitbucketProjectRequest {
    pub key: String,
}
