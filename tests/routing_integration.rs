//! End-to-end routing: a search hit flows from the search backend through the
//! PR router to the matching code-host backend, and only that backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use repoherd::config::{
    AppSettings, AuthMethod, BitbucketServerSettings, CloneType, CodeHostSettings, ForkPolicy,
    GithubComSettings, SearchHostSettings, SettingsLoader, SourcegraphSettings,
    StaticSettingsLoader,
};
use repoherd::http::ClientFactory;
use repoherd::notify::{CollectingNotifier, NotificationSink};
use repoherd::search::{
    GithubSearchClient, SearchResult, SearchRouter, SourcegraphSearchClient,
};
use repoherd::secrets::{CredentialStore, MemoryCredentialStore};
use repoherd::vcs::bitbucket::BitbucketServerClient;
use repoherd::vcs::github::GithubComClient;
use repoherd::vcs::{PrRouter, PullRequestWrapper};

const SEARCH_HOST: &str = "sourcegraph.com";
const GITHUB_CODE_HOST: &str = "github.com";
const BITBUCKET_CODE_HOST: &str = "bitbucket.example.com";

struct Harness {
    search_router: SearchRouter,
    pr_router: PrRouter,
    notifier: Arc<CollectingNotifier>,
}

fn harness(sg_url: &str, gh_url: &str, bb_url: &str) -> Harness {
    let mut code_hosts = BTreeMap::new();
    code_hosts.insert(
        GITHUB_CODE_HOST.to_string(),
        CodeHostSettings::GithubCom(GithubComSettings {
            base_url: gh_url.to_string(),
            clone_pattern: "git@github.com:{project}/{repo}.git".to_string(),
            https_override: None,
            auth_method: AuthMethod::UsernameToken,
            username: Some("octocat".to_string()),
            fork_policy: ForkPolicy::PlainBranch,
            fork_repo_prefix: None,
            clone_type: CloneType::Ssh,
            keep_local_repos: None,
        }),
    );
    code_hosts.insert(
        BITBUCKET_CODE_HOST.to_string(),
        CodeHostSettings::BitbucketServer(BitbucketServerSettings {
            base_url: bb_url.to_string(),
            clone_pattern: "ssh://git@bitbucket.example.com/{project}/{repo}.git".to_string(),
            https_override: None,
            auth_method: AuthMethod::UsernameToken,
            username: Some("jane".to_string()),
            fork_policy: ForkPolicy::LazyFork,
            fork_repo_prefix: Some("herd_".to_string()),
            clone_type: CloneType::Ssh,
            keep_local_repos: None,
        }),
    );
    let mut search_hosts = BTreeMap::new();
    search_hosts.insert(
        SEARCH_HOST.to_string(),
        SearchHostSettings::Sourcegraph(SourcegraphSettings {
            base_url: sg_url.to_string(),
            https_override: None,
            auth_method: AuthMethod::JustToken,
            username: None,
            code_hosts,
        }),
    );
    let settings = AppSettings {
        concurrency: 5,
        default_https_override: None,
        search_hosts,
    };

    let credentials = MemoryCredentialStore::new();
    credentials.set_password("token", sg_url, "sg-token");
    credentials.set_password("octocat", gh_url, "gh-token");
    credentials.set_password("jane", bb_url, "bb-token");

    let loader: Arc<dyn SettingsLoader> = Arc::new(StaticSettingsLoader::new(settings));
    let notifier = Arc::new(CollectingNotifier::new());
    let sink: Arc<dyn NotificationSink> = Arc::clone(&notifier) as Arc<dyn NotificationSink>;
    let factory = Arc::new(ClientFactory::new(
        Arc::clone(&loader),
        Arc::new(credentials),
        Arc::clone(&sink),
    ));

    Harness {
        search_router: SearchRouter::new(
            Arc::clone(&loader),
            SourcegraphSearchClient::new(Arc::clone(&factory)),
            GithubSearchClient::new(Arc::clone(&factory)),
            Arc::clone(&sink),
        ),
        pr_router: PrRouter::new(
            loader,
            BitbucketServerClient::new(Arc::clone(&factory), Arc::clone(&sink)),
            GithubComClient::new(factory, Arc::clone(&sink)),
            sink,
        ),
        notifier,
    }
}

fn gh_repo_json() -> serde_json::Value {
    json!({
        "id": 1,
        "name": "widget",
        "full_name": "acme/widget",
        "owner": {"login": "acme"},
        "private": false,
        "fork": false,
        "default_branch": "main",
        "ssh_url": "git@github.com:acme/widget.git",
        "clone_url": "https://github.com/acme/widget.git"
    })
}

#[tokio::test]
async fn search_hit_routes_a_pr_to_github_and_leaves_bitbucket_untouched() {
    let sg = MockServer::start().await;
    let gh = MockServer::start().await;
    let bb = MockServer::start().await;
    let h = harness(&sg.uri(), &gh.uri(), &bb.uri());

    Mock::given(method("POST"))
        .and(path("/.api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"search": {"results": {"results": [
                {"__typename": "Repository", "name": "github.com/acme/widget"}
            ]}}}
        })))
        .expect(1)
        .mount(&sg)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gh_repo_json()))
        .mount(&gh)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/widget/pulls"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 900,
            "number": 12,
            "url": format!("{}/repos/acme/widget/pulls/12", gh.uri()),
            "html_url": "https://github.com/acme/widget/pull/12",
            "state": "open",
            "title": "Bump dependency",
            "body": "automated bump",
            "head": {"ref": "bump", "repo": gh_repo_json()},
            "base": {"ref": "main", "repo": gh_repo_json()}
        })))
        .expect(1)
        .mount(&gh)
        .await;
    // The Bitbucket backend must never be consulted for a github.com result.
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&bb)
        .await;

    let hits: BTreeSet<SearchResult> = h
        .search_router
        .search(SEARCH_HOST, "repo:acme/widget")
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    let hit = hits.iter().next().unwrap();
    assert_eq!(hit.code_host_name, GITHUB_CODE_HOST);
    assert_eq!(hit.project, "acme");
    assert_eq!(hit.repo, "widget");

    let created = h
        .pr_router
        .create_pr("Bump dependency", "automated bump", "bump", hit)
        .await
        .unwrap()
        .expect("config resolves");

    match &created {
        PullRequestWrapper::GithubCom(wrapper) => {
            assert_eq!(wrapper.pr.number, 12);
            assert_eq!(wrapper.pr.title, "Bump dependency");
        }
        other => panic!("routed to the wrong backend: {:?}", other),
    }
    assert_eq!(created.project(), "acme");
    assert_eq!(created.repo_slug(), "widget");
    assert!(h.notifier.titles().is_empty());
    // The zero-expectation Bitbucket mock verifies on drop.
}

#[tokio::test]
async fn the_pull_request_submission_targets_the_default_branch() {
    let sg = MockServer::start().await;
    let gh = MockServer::start().await;
    let bb = MockServer::start().await;
    let h = harness(&sg.uri(), &gh.uri(), &bb.uri());

    Mock::given(method("GET"))
        .and(path("/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gh_repo_json()))
        .mount(&gh)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/widget/pulls"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 900,
            "number": 12,
            "url": format!("{}/repos/acme/widget/pulls/12", gh.uri()),
            "html_url": "https://github.com/acme/widget/pull/12",
            "state": "open",
            "title": "Bump dependency",
            "body": "automated bump"
        })))
        .mount(&gh)
        .await;

    let hit = SearchResult::new(SEARCH_HOST, GITHUB_CODE_HOST, "acme", "widget");
    h.pr_router
        .create_pr("Bump dependency", "automated bump", "bump", &hit)
        .await
        .unwrap()
        .expect("config resolves");

    let requests = gh.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("pull request submitted");
    let body: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
    // PlainBranch pushes from a same-repo branch against the default branch.
    assert_eq!(body["head"], "bump");
    assert_eq!(body["base"], "main");
    assert_eq!(body["maintainer_can_modify"], true);
}

#[tokio::test]
async fn an_unknown_code_host_skips_the_operation_with_a_warning() {
    let sg = MockServer::start().await;
    let gh = MockServer::start().await;
    let bb = MockServer::start().await;
    let h = harness(&sg.uri(), &gh.uri(), &bb.uri());

    let hit = SearchResult::new(SEARCH_HOST, "gitlab.example.com", "acme", "widget");
    let created = h
        .pr_router
        .create_pr("Bump dependency", "automated bump", "bump", &hit)
        .await
        .unwrap();

    assert!(created.is_none());
    assert_eq!(h.notifier.titles(), vec!["Missing config"]);
}
