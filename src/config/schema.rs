//! config::schema
//!
//! Settings schema types.
//!
//! # Shape
//!
//! Settings form a tree: the top-level [`AppSettings`] maps search-host names
//! to [`SearchHostSettings`], and each search host maps code-host names to
//! [`CodeHostSettings`]. Both host levels are closed, internally tagged sum
//! types (`type = "..."` in the TOML file) so that adding a backend is a
//! single-point change and routing can match exhaustively.
//!
//! # Validation
//!
//! Config values are validated after parsing. Validation enforces the
//! structural invariants the rest of the crate relies on: non-empty host
//! maps, clone patterns with `{project}`/`{repo}` placeholders, usernames
//! present where the auth method or fork policy requires them.
//!
//! # Example
//!
//! ```toml
//! concurrency = 5
//!
//! [search_hosts."sourcegraph.com"]
//! type = "sourcegraph"
//! base_url = "https://sourcegraph.com"
//!
//! [search_hosts."sourcegraph.com".code_hosts."github.com"]
//! type = "github_com"
//! username = "octocat"
//! fork_policy = "lazy_fork"
//! fork_repo_prefix = "herd_"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// TLS trust relaxation for a host.
///
/// `AllowAnything` disables hostname verification and chain validation
/// entirely. It is a deliberately dangerous opt-in for lab setups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpsOverride {
    /// Trust self-signed certificates only.
    AllowSelfSignedCert,
    /// Trust any certificate, any hostname.
    AllowAnything,
}

/// How a host authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Username + token pair, sent as a Basic header.
    UsernameToken,
    /// Bare token, stored under the literal username `token`.
    JustToken,
    /// No authentication at all.
    None,
}

/// Strategy for obtaining push rights on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForkPolicy {
    /// Push a branch straight to origin. Requires write access.
    PlainBranch,
    /// Fork only when a direct push is denied.
    #[default]
    LazyFork,
    /// Fork before push, for every repo.
    EagerFork,
}

/// Protocol used for clone URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CloneType {
    #[default]
    Ssh,
    Https,
}

/// Backend identifier for code hosts.
///
/// Carried by both [`CodeHostSettings`] and the wrapper types in `vcs` so
/// the router can match the pair with a single comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeHostKind {
    BitbucketServer,
    GithubCom,
}

impl std::fmt::Display for CodeHostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeHostKind::BitbucketServer => write!(f, "bitbucket_server"),
            CodeHostKind::GithubCom => write!(f, "github_com"),
        }
    }
}

/// Backend identifier for search hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchHostKind {
    Sourcegraph,
    GithubSearch,
}

impl std::fmt::Display for SearchHostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchHostKind::Sourcegraph => write!(f, "sourcegraph"),
            SearchHostKind::GithubSearch => write!(f, "github_search"),
        }
    }
}

/// A host that can authenticate HTTP requests.
///
/// Implemented by every settings variant; the HTTP client factory works
/// against this trait instead of the concrete variants.
pub trait HostAuth {
    fn base_url(&self) -> &str;
    fn auth_method(&self) -> AuthMethod;
    fn username(&self) -> Option<&str>;

    /// Compute the `Authorization` header value for a resolved password.
    ///
    /// Returns `None` when the auth method produces no header.
    fn auth_header_value(&self, password: &str) -> Option<String>;
}

fn basic_header(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", username, password))
    )
}

/// Where a completed clone is kept for later reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepLocalRepos {
    /// Cache root; clones land at `{path}/{project}/{repo}`.
    pub path: PathBuf,
}

// --------------------------------------------------------------------------
// Top level
// --------------------------------------------------------------------------

fn default_concurrency() -> usize {
    5
}

/// Root settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSettings {
    /// How many repositories may be worked on concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Fallback TLS trust override when neither host level sets one.
    #[serde(default)]
    pub default_https_override: Option<HttpsOverride>,

    /// Search hosts by name. Must be non-empty.
    pub search_hosts: BTreeMap<String, SearchHostSettings>,
}

impl AppSettings {
    /// Validate the whole settings tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_hosts.is_empty() {
            return Err(ConfigError::InvalidValue(
                "at least one search host is required".to_string(),
            ));
        }
        for (name, host) in &self.search_hosts {
            host.validate()
                .map_err(|e| ConfigError::InvalidValue(format!("search host '{}': {}", name, e)))?;
        }
        Ok(())
    }

    /// Effective TLS override for a search host.
    pub fn resolve_https_override(&self, search_host: &str) -> Option<HttpsOverride> {
        self.search_hosts
            .get(search_host)
            .and_then(|s| s.https_override())
            .or(self.default_https_override)
    }

    /// Effective TLS override for a code host.
    ///
    /// Precedence: code host, then search host, then the global default.
    pub fn resolve_code_https_override(
        &self,
        search_host: &str,
        code_host: &str,
    ) -> Option<HttpsOverride> {
        self.search_hosts
            .get(search_host)
            .and_then(|s| s.code_hosts().get(code_host))
            .and_then(|c| c.https_override())
            .or_else(|| self.resolve_https_override(search_host))
    }

    /// Look up code-host settings under a search host.
    pub fn resolve_code_host(
        &self,
        search_host: &str,
        code_host: &str,
    ) -> Option<&CodeHostSettings> {
        self.search_hosts
            .get(search_host)
            .and_then(|s| s.code_hosts().get(code_host))
    }
}

// --------------------------------------------------------------------------
// Search hosts
// --------------------------------------------------------------------------

/// Settings for one search host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchHostSettings {
    Sourcegraph(SourcegraphSettings),
    GithubSearch(GithubSearchSettings),
}

impl SearchHostSettings {
    pub fn kind(&self) -> SearchHostKind {
        match self {
            SearchHostSettings::Sourcegraph(_) => SearchHostKind::Sourcegraph,
            SearchHostSettings::GithubSearch(_) => SearchHostKind::GithubSearch,
        }
    }

    pub fn https_override(&self) -> Option<HttpsOverride> {
        match self {
            SearchHostSettings::Sourcegraph(s) => s.https_override,
            SearchHostSettings::GithubSearch(s) => s.https_override,
        }
    }

    pub fn code_hosts(&self) -> &BTreeMap<String, CodeHostSettings> {
        match self {
            SearchHostSettings::Sourcegraph(s) => &s.code_hosts,
            SearchHostSettings::GithubSearch(s) => &s.code_hosts,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (base_url, auth, username, code_hosts) = match self {
            SearchHostSettings::Sourcegraph(s) => {
                (&s.base_url, s.auth_method, s.username.as_deref(), &s.code_hosts)
            }
            SearchHostSettings::GithubSearch(s) => {
                (&s.base_url, s.auth_method, s.username.as_deref(), &s.code_hosts)
            }
        };
        validate_base_url(base_url)?;
        validate_username_rule(base_url, auth, username)?;
        if code_hosts.is_empty() {
            return Err(ConfigError::InvalidValue(
                "at least one code host is required".to_string(),
            ));
        }
        for (name, host) in code_hosts {
            host.validate()
                .map_err(|e| ConfigError::InvalidValue(format!("code host '{}': {}", name, e)))?;
        }
        Ok(())
    }
}

impl HostAuth for SearchHostSettings {
    fn base_url(&self) -> &str {
        match self {
            SearchHostSettings::Sourcegraph(s) => s.base_url(),
            SearchHostSettings::GithubSearch(s) => s.base_url(),
        }
    }

    fn auth_method(&self) -> AuthMethod {
        match self {
            SearchHostSettings::Sourcegraph(s) => s.auth_method(),
            SearchHostSettings::GithubSearch(s) => s.auth_method(),
        }
    }

    fn username(&self) -> Option<&str> {
        match self {
            SearchHostSettings::Sourcegraph(s) => s.username(),
            SearchHostSettings::GithubSearch(s) => s.username(),
        }
    }

    fn auth_header_value(&self, password: &str) -> Option<String> {
        match self {
            SearchHostSettings::Sourcegraph(s) => s.auth_header_value(password),
            SearchHostSettings::GithubSearch(s) => s.auth_header_value(password),
        }
    }
}

impl HostAuth for SourcegraphSettings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    // Sourcegraph uses its own token scheme.
    fn auth_header_value(&self, password: &str) -> Option<String> {
        match self.auth_method {
            AuthMethod::JustToken | AuthMethod::UsernameToken => {
                Some(format!("token {}", password))
            }
            AuthMethod::None => None,
        }
    }
}

impl HostAuth for GithubSearchSettings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn auth_header_value(&self, password: &str) -> Option<String> {
        match self.auth_method {
            AuthMethod::UsernameToken => {
                Some(basic_header(self.username.as_deref().unwrap_or("token"), password))
            }
            AuthMethod::JustToken => Some(basic_header("token", password)),
            AuthMethod::None => None,
        }
    }
}

fn default_just_token() -> AuthMethod {
    AuthMethod::JustToken
}

fn default_username_token() -> AuthMethod {
    AuthMethod::UsernameToken
}

/// Sourcegraph search host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcegraphSettings {
    pub base_url: String,
    #[serde(default)]
    pub https_override: Option<HttpsOverride>,
    #[serde(default = "default_just_token")]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub username: Option<String>,
    pub code_hosts: BTreeMap<String, CodeHostSettings>,
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

/// GitHub used as a search host (the repository search API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubSearchSettings {
    #[serde(default = "default_github_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub https_override: Option<HttpsOverride>,
    #[serde(default = "default_username_token")]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub username: Option<String>,
    pub code_hosts: BTreeMap<String, CodeHostSettings>,
}

// --------------------------------------------------------------------------
// Code hosts
// --------------------------------------------------------------------------

/// Settings for one code host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeHostSettings {
    BitbucketServer(BitbucketServerSettings),
    GithubCom(GithubComSettings),
}

impl CodeHostSettings {
    pub fn kind(&self) -> CodeHostKind {
        match self {
            CodeHostSettings::BitbucketServer(_) => CodeHostKind::BitbucketServer,
            CodeHostSettings::GithubCom(_) => CodeHostKind::GithubCom,
        }
    }

    pub fn https_override(&self) -> Option<HttpsOverride> {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.https_override,
            CodeHostSettings::GithubCom(s) => s.https_override,
        }
    }

    pub fn clone_type(&self) -> CloneType {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.clone_type,
            CodeHostSettings::GithubCom(s) => s.clone_type,
        }
    }

    pub fn fork_policy(&self) -> ForkPolicy {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.fork_policy,
            CodeHostSettings::GithubCom(s) => s.fork_policy,
        }
    }

    pub fn keep_local_repos(&self) -> Option<&KeepLocalRepos> {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.keep_local_repos.as_ref(),
            CodeHostSettings::GithubCom(s) => s.keep_local_repos.as_ref(),
        }
    }

    /// Expand the clone pattern for a concrete repository.
    pub fn clone_url(&self, project: &str, repo: &str) -> String {
        let pattern = match self {
            CodeHostSettings::BitbucketServer(s) => &s.clone_pattern,
            CodeHostSettings::GithubCom(s) => &s.clone_pattern,
        };
        pattern
            .replace("{project}", project)
            .replace("{repo}", repo)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (base_url, clone_pattern, auth, username, fork_policy, fork_prefix) = match self {
            CodeHostSettings::BitbucketServer(s) => (
                &s.base_url,
                &s.clone_pattern,
                s.auth_method,
                s.username.as_deref(),
                s.fork_policy,
                s.fork_repo_prefix.as_deref(),
            ),
            CodeHostSettings::GithubCom(s) => (
                &s.base_url,
                &s.clone_pattern,
                s.auth_method,
                s.username.as_deref(),
                s.fork_policy,
                s.fork_repo_prefix.as_deref(),
            ),
        };
        validate_base_url(base_url)?;
        for word in ["project", "repo"] {
            if !clone_pattern.contains(&format!("{{{}}}", word)) {
                return Err(ConfigError::InvalidValue(format!(
                    "clone_pattern must contain {{{}}}, \
                     try something like ssh://git@bitbucket.example.com/{{project}}/{{repo}}.git",
                    word
                )));
            }
        }
        validate_username_rule(base_url, auth, username)?;
        if fork_policy != ForkPolicy::PlainBranch {
            if username.map(str::is_empty).unwrap_or(true) {
                return Err(ConfigError::InvalidValue(
                    "username is required unless fork_policy is plain_branch".to_string(),
                ));
            }
            if fork_prefix.is_none() {
                return Err(ConfigError::InvalidValue(
                    "fork_repo_prefix is required unless fork_policy is plain_branch".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl HostAuth for CodeHostSettings {
    fn base_url(&self) -> &str {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.base_url(),
            CodeHostSettings::GithubCom(s) => s.base_url(),
        }
    }

    fn auth_method(&self) -> AuthMethod {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.auth_method(),
            CodeHostSettings::GithubCom(s) => s.auth_method(),
        }
    }

    fn username(&self) -> Option<&str> {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.username.as_deref(),
            CodeHostSettings::GithubCom(s) => s.username.as_deref(),
        }
    }

    fn auth_header_value(&self, password: &str) -> Option<String> {
        match self {
            CodeHostSettings::BitbucketServer(s) => s.auth_header_value(password),
            CodeHostSettings::GithubCom(s) => s.auth_header_value(password),
        }
    }
}

impl HostAuth for BitbucketServerSettings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn auth_header_value(&self, password: &str) -> Option<String> {
        basic_auth_header_value(self.auth_method, self.username.as_deref(), password)
    }
}

impl HostAuth for GithubComSettings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn auth_header_value(&self, password: &str) -> Option<String> {
        basic_auth_header_value(self.auth_method, self.username.as_deref(), password)
    }
}

fn basic_auth_header_value(
    auth: AuthMethod,
    username: Option<&str>,
    password: &str,
) -> Option<String> {
    match auth {
        AuthMethod::UsernameToken => Some(basic_header(username.unwrap_or("token"), password)),
        AuthMethod::JustToken => Some(basic_header("token", password)),
        AuthMethod::None => None,
    }
}

/// Bitbucket Server (self-hosted) code host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BitbucketServerSettings {
    pub base_url: String,
    pub clone_pattern: String,
    #[serde(default)]
    pub https_override: Option<HttpsOverride>,
    #[serde(default = "default_username_token")]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub fork_policy: ForkPolicy,
    #[serde(default)]
    pub fork_repo_prefix: Option<String>,
    #[serde(default)]
    pub clone_type: CloneType,
    #[serde(default)]
    pub keep_local_repos: Option<KeepLocalRepos>,
}

fn default_github_clone_pattern() -> String {
    "git@github.com:{project}/{repo}.git".to_string()
}

/// github.com code host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubComSettings {
    #[serde(default = "default_github_base_url")]
    pub base_url: String,
    #[serde(default = "default_github_clone_pattern")]
    pub clone_pattern: String,
    #[serde(default)]
    pub https_override: Option<HttpsOverride>,
    #[serde(default = "default_username_token")]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub fork_policy: ForkPolicy,
    #[serde(default)]
    pub fork_repo_prefix: Option<String>,
    #[serde(default)]
    pub clone_type: CloneType,
    #[serde(default)]
    pub keep_local_repos: Option<KeepLocalRepos>,
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::InvalidValue(format!(
            "base_url must start with http:// or https://, got '{}'",
            base_url
        )));
    }
    for c in ['/', '?', '=', '&'] {
        if base_url.ends_with(c) {
            return Err(ConfigError::InvalidValue(format!(
                "base_url must not end in '{}'",
                c
            )));
        }
    }
    Ok(())
}

fn validate_username_rule(
    base_url: &str,
    auth: AuthMethod,
    username: Option<&str>,
) -> Result<(), ConfigError> {
    if auth == AuthMethod::UsernameToken && username.map(str::is_empty).unwrap_or(true) {
        return Err(ConfigError::InvalidValue(format!(
            "{}: username is required for auth method username_token",
            base_url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github_settings() -> GithubComSettings {
        GithubComSettings {
            base_url: default_github_base_url(),
            clone_pattern: default_github_clone_pattern(),
            https_override: None,
            auth_method: AuthMethod::UsernameToken,
            username: Some("octocat".to_string()),
            fork_policy: ForkPolicy::LazyFork,
            fork_repo_prefix: Some("herd_".to_string()),
            clone_type: CloneType::Ssh,
            keep_local_repos: None,
        }
    }

    fn bitbucket_settings() -> BitbucketServerSettings {
        BitbucketServerSettings {
            base_url: "https://bitbucket.example.com".to_string(),
            clone_pattern: "ssh://git@bitbucket.example.com/{project}/{repo}.git".to_string(),
            https_override: None,
            auth_method: AuthMethod::UsernameToken,
            username: Some("jane".to_string()),
            fork_policy: ForkPolicy::PlainBranch,
            fork_repo_prefix: None,
            clone_type: CloneType::Ssh,
            keep_local_repos: None,
        }
    }

    fn app_settings(code_host: CodeHostSettings) -> AppSettings {
        let mut code_hosts = BTreeMap::new();
        code_hosts.insert("github.com".to_string(), code_host);
        let mut search_hosts = BTreeMap::new();
        search_hosts.insert(
            "sourcegraph.com".to_string(),
            SearchHostSettings::Sourcegraph(SourcegraphSettings {
                base_url: "https://sourcegraph.com".to_string(),
                https_override: None,
                auth_method: AuthMethod::JustToken,
                username: None,
                code_hosts,
            }),
        );
        AppSettings {
            concurrency: 5,
            default_https_override: None,
            search_hosts,
        }
    }

    #[test]
    fn valid_settings_pass_validation() {
        let settings = app_settings(CodeHostSettings::GithubCom(github_settings()));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn empty_search_hosts_rejected() {
        let settings = AppSettings {
            concurrency: 5,
            default_https_override: None,
            search_hosts: BTreeMap::new(),
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn clone_pattern_requires_project_placeholder() {
        let mut bb = bitbucket_settings();
        bb.clone_pattern = "ssh://git@host/{repo}.git".to_string();
        let err = CodeHostSettings::BitbucketServer(bb).validate().unwrap_err();
        assert!(err.to_string().contains("{project}"));
    }

    #[test]
    fn clone_pattern_requires_repo_placeholder() {
        let mut bb = bitbucket_settings();
        bb.clone_pattern = "ssh://git@host/{project}/x.git".to_string();
        let err = CodeHostSettings::BitbucketServer(bb).validate().unwrap_err();
        assert!(err.to_string().contains("{repo}"));
    }

    #[test]
    fn fork_policy_requires_username_and_prefix() {
        for policy in [ForkPolicy::LazyFork, ForkPolicy::EagerFork] {
            let mut gh = github_settings();
            gh.fork_policy = policy;
            gh.fork_repo_prefix = None;
            assert!(CodeHostSettings::GithubCom(gh).validate().is_err());

            let mut gh = github_settings();
            gh.fork_policy = policy;
            gh.auth_method = AuthMethod::JustToken;
            gh.username = None;
            assert!(CodeHostSettings::GithubCom(gh).validate().is_err());
        }
    }

    #[test]
    fn plain_branch_needs_no_fork_prefix() {
        let mut gh = github_settings();
        gh.fork_policy = ForkPolicy::PlainBranch;
        gh.fork_repo_prefix = None;
        assert!(CodeHostSettings::GithubCom(gh).validate().is_ok());
    }

    #[test]
    fn username_required_for_username_token() {
        let mut bb = bitbucket_settings();
        bb.username = None;
        assert!(CodeHostSettings::BitbucketServer(bb).validate().is_err());
    }

    #[test]
    fn base_url_must_be_http() {
        let mut bb = bitbucket_settings();
        bb.base_url = "ftp://bitbucket.example.com".to_string();
        assert!(CodeHostSettings::BitbucketServer(bb).validate().is_err());
    }

    #[test]
    fn base_url_must_not_end_in_separator() {
        let mut bb = bitbucket_settings();
        bb.base_url = "https://bitbucket.example.com/".to_string();
        assert!(CodeHostSettings::BitbucketServer(bb).validate().is_err());
    }

    #[test]
    fn https_override_precedence_code_host_wins() {
        let mut gh = github_settings();
        gh.https_override = Some(HttpsOverride::AllowSelfSignedCert);
        let mut settings = app_settings(CodeHostSettings::GithubCom(gh));
        settings.default_https_override = Some(HttpsOverride::AllowAnything);

        assert_eq!(
            settings.resolve_code_https_override("sourcegraph.com", "github.com"),
            Some(HttpsOverride::AllowSelfSignedCert)
        );
        // Search host has no override, so the global default applies there.
        assert_eq!(
            settings.resolve_https_override("sourcegraph.com"),
            Some(HttpsOverride::AllowAnything)
        );
    }

    #[test]
    fn https_override_falls_back_to_global_default() {
        let mut settings = app_settings(CodeHostSettings::GithubCom(github_settings()));
        settings.default_https_override = Some(HttpsOverride::AllowSelfSignedCert);
        assert_eq!(
            settings.resolve_code_https_override("sourcegraph.com", "github.com"),
            Some(HttpsOverride::AllowSelfSignedCert)
        );
        assert_eq!(
            settings.resolve_code_https_override("sourcegraph.com", "missing"),
            Some(HttpsOverride::AllowSelfSignedCert)
        );
    }

    #[test]
    fn clone_url_expands_placeholders() {
        let bb = CodeHostSettings::BitbucketServer(bitbucket_settings());
        assert_eq!(
            bb.clone_url("PROJ", "repo-one"),
            "ssh://git@bitbucket.example.com/PROJ/repo-one.git"
        );
    }

    #[test]
    fn toml_round_trip_with_type_tags() {
        let toml_src = r#"
            concurrency = 3

            [search_hosts."sourcegraph.com"]
            type = "sourcegraph"
            base_url = "https://sourcegraph.com"

            [search_hosts."sourcegraph.com".code_hosts."github.com"]
            type = "github_com"
            username = "octocat"
            fork_repo_prefix = "herd_"
        "#;
        let settings: AppSettings = toml::from_str(toml_src).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.concurrency, 3);
        let code = settings
            .resolve_code_host("sourcegraph.com", "github.com")
            .unwrap();
        assert_eq!(code.kind(), CodeHostKind::GithubCom);
        assert_eq!(code.clone_url("a", "b"), "git@github.com:a/b.git");
    }

    #[test]
    fn auth_header_for_username_token_is_basic() {
        let gh = CodeHostSettings::GithubCom(github_settings());
        let header = gh.auth_header_value("s3cr3t").unwrap();
        assert!(header.starts_with("Basic "));
        // "octocat:s3cr3t" base64-encoded
        assert_eq!(header, "Basic b2N0b2NhdDpzM2NyM3Q=");
    }

    #[test]
    fn no_auth_header_for_none() {
        let mut gh = github_settings();
        gh.auth_method = AuthMethod::None;
        gh.fork_policy = ForkPolicy::PlainBranch;
        assert_eq!(
            CodeHostSettings::GithubCom(gh).auth_header_value("x"),
            None
        );
    }

    #[test]
    fn sourcegraph_header_uses_token_scheme() {
        let settings = app_settings(CodeHostSettings::GithubCom(github_settings()));
        let host = settings.search_hosts.get("sourcegraph.com").unwrap();
        assert_eq!(
            host.auth_header_value("abc"),
            Some("token abc".to_string())
        );
    }
}
