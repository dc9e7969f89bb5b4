//! Integration tests for the Bitbucket Server client, against a mock server.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use repoherd::config::{
    AppSettings, AuthMethod, BitbucketServerSettings, CloneType, CodeHostSettings, ForkPolicy,
    SearchHostSettings, SourcegraphSettings, StaticSettingsLoader,
};
use repoherd::http::ClientFactory;
use repoherd::notify::{CollectingNotifier, NotificationSink};
use repoherd::search::SearchResult;
use repoherd::secrets::{CredentialStore, MemoryCredentialStore};
use repoherd::vcs::bitbucket::types::{
    BitbucketBranchRef, BitbucketProject, BitbucketPullRequest, BitbucketRepo,
};
use repoherd::vcs::bitbucket::BitbucketServerClient;
use repoherd::vcs::{BitbucketPullRequestWrapper, PrRole};

const SEARCH_HOST: &str = "sg";
const CODE_HOST: &str = "bb";

fn bitbucket_settings(base_url: &str) -> BitbucketServerSettings {
    BitbucketServerSettings {
        base_url: base_url.to_string(),
        clone_pattern: "ssh://git@bb.example.com/{project}/{repo}.git".to_string(),
        https_override: None,
        auth_method: AuthMethod::UsernameToken,
        username: Some("jane".to_string()),
        fork_policy: ForkPolicy::LazyFork,
        fork_repo_prefix: Some("herd_".to_string()),
        clone_type: CloneType::Ssh,
        keep_local_repos: None,
    }
}

fn app_settings(base_url: &str) -> AppSettings {
    let mut code_hosts = BTreeMap::new();
    code_hosts.insert(
        CODE_HOST.to_string(),
        CodeHostSettings::BitbucketServer(bitbucket_settings(base_url)),
    );
    let mut search_hosts = BTreeMap::new();
    search_hosts.insert(
        SEARCH_HOST.to_string(),
        SearchHostSettings::Sourcegraph(SourcegraphSettings {
            base_url: "https://sg.example.com".to_string(),
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

fn client(base_url: &str) -> (BitbucketServerClient, Arc<CollectingNotifier>) {
    let credentials = MemoryCredentialStore::new();
    credentials.set_password("jane", base_url, "hunter2");
    let notifier = Arc::new(CollectingNotifier::new());
    let factory = Arc::new(ClientFactory::new(
        Arc::new(StaticSettingsLoader::new(app_settings(base_url))),
        Arc::new(credentials),
        Arc::clone(&notifier) as Arc<dyn NotificationSink>,
    ));
    (
        BitbucketServerClient::new(factory, Arc::clone(&notifier) as Arc<dyn NotificationSink>),
        notifier,
    )
}

fn pr_json(id: u64) -> Value {
    json!({
        "id": id,
        "version": 1,
        "title": format!("PR {}", id),
        "description": "bulk change",
        "fromRef": {
            "id": "refs/heads/bump",
            "repository": {"id": 11, "slug": "a-repo", "project": {"key": "PROJ"}}
        },
        "toRef": {
            "id": "refs/heads/main",
            "repository": {"id": 11, "slug": "a-repo", "project": {"key": "PROJ"}}
        },
        "reviewers": []
    })
}

fn page_json(ids: std::ops::Range<u64>, is_last_page: bool) -> Value {
    let values: Vec<Value> = ids.map(pr_json).collect();
    json!({
        "size": values.len(),
        "isLastPage": is_last_page,
        "values": values
    })
}

#[tokio::test]
async fn dashboard_pagination_gathers_all_pages_in_exactly_three_requests() {
    let server = MockServer::start().await;
    let (client, _) = client(&server.uri());

    for (start, range, last) in [
        (0u64, 0u64..100, false),
        (100, 100..200, false),
        (200, 200..237, true),
    ] {
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/dashboard/pull-requests"))
            .and(query_param("state", "OPEN"))
            .and(query_param("role", "AUTHOR"))
            .and(query_param("start", start.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(range, last)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let settings = bitbucket_settings(&server.uri());
    let prs = client
        .get_all_prs(SEARCH_HOST, CODE_HOST, &settings, PrRole::Author)
        .await
        .unwrap();

    assert_eq!(prs.len(), 237);
    assert_eq!(prs[0].pr.id, Some(0));
    assert_eq!(prs[236].pr.id, Some(236));
    // Mock expectations verify exactly three page requests on drop.
}

#[tokio::test]
async fn dashboard_pagination_degrades_to_partial_results_on_server_error() {
    let server = MockServer::start().await;
    let (client, _) = client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/dashboard/pull-requests"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(0..100, false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/dashboard/pull-requests"))
        .and(query_param("start", "100"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let settings = bitbucket_settings(&server.uri());
    let prs = client
        .get_all_prs(SEARCH_HOST, CODE_HOST, &settings, PrRole::Author)
        .await
        .unwrap();

    assert_eq!(prs.len(), 100);
}

#[tokio::test]
async fn dashboard_pagination_stops_on_an_empty_page_not_marked_last() {
    let server = MockServer::start().await;
    let (client, _) = client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/dashboard/pull-requests"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(0..100, false)))
        .mount(&server)
        .await;
    // A server that answers an empty page while still claiming more data
    // would otherwise be re-queried at the same offset forever.
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/dashboard/pull-requests"))
        .and(query_param("start", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "size": 0,
            "isLastPage": false,
            "values": []
        })))
        .mount(&server)
        .await;

    let settings = bitbucket_settings(&server.uri());
    let prs = tokio::time::timeout(
        std::time::Duration::from_secs(3),
        client.get_all_prs(SEARCH_HOST, CODE_HOST, &settings, PrRole::Author),
    )
    .await
    .expect("listing terminates on the empty page")
    .unwrap();

    assert_eq!(prs.len(), 100);
}

#[tokio::test]
async fn create_fork_twice_issues_at_most_one_create_call() {
    let server = MockServer::start().await;
    let (client, _) = client(&server.uri());

    let fork_json = json!({
        "id": 42,
        "slug": "herd_a-repo",
        "project": {"key": "~jane"},
        "links": {"clone": [
            {"name": "ssh", "href": "ssh://git@bb.example.com/~jane/herd_a-repo.git"},
            {"name": "http", "href": "https://bb.example.com/scm/~jane/herd_a-repo.git"}
        ]}
    });

    // First lookup misses, every later lookup hits.
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/users/~jane/repos/herd_a-repo"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/users/~jane/repos/herd_a-repo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fork_json.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/a-repo"))
        .respond_with(ResponseTemplate::new(201).set_body_json(fork_json))
        .expect(1)
        .mount(&server)
        .await;

    let settings = bitbucket_settings(&server.uri());
    let repo = SearchResult::new(SEARCH_HOST, CODE_HOST, "PROJ", "a-repo");

    let first = client.create_fork(&settings, &repo).await.unwrap();
    let second = client.create_fork(&settings, &repo).await.unwrap();

    assert_eq!(
        first.as_deref(),
        Some("ssh://git@bb.example.com/~jane/herd_a-repo.git")
    );
    assert_eq!(first, second);
    // POST expectation (exactly one fork creation) verifies on drop.
}

#[tokio::test]
async fn add_default_reviewers_submits_the_deduplicated_union() {
    let server = MockServer::start().await;
    let (client, _) = client(&server.uri());

    Mock::given(method("GET"))
        .and(path(
            "/rest/default-reviewers/1.0/projects/PROJ/repos/a-repo/reviewers",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "bob"},
            {"name": "carol"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/a-repo/pull-requests/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(7)))
        .expect(1)
        .mount(&server)
        .await;

    let settings = bitbucket_settings(&server.uri());
    let pull_request = BitbucketPullRequestWrapper {
        search_host: SEARCH_HOST.to_string(),
        code_host: CODE_HOST.to_string(),
        pr: BitbucketPullRequest {
            id: Some(7),
            version: Some(1),
            title: "PR 7".to_string(),
            description: None,
            from_ref: BitbucketBranchRef {
                id: "refs/heads/bump".to_string(),
                repository: BitbucketRepo {
                    id: Some(11),
                    slug: "a-repo".to_string(),
                    project: Some(BitbucketProject {
                        key: "PROJ".to_string(),
                    }),
                    links: None,
                },
            },
            to_ref: BitbucketBranchRef {
                id: "refs/heads/main".to_string(),
                repository: BitbucketRepo {
                    id: Some(11),
                    slug: "a-repo".to_string(),
                    project: Some(BitbucketProject {
                        key: "PROJ".to_string(),
                    }),
                    links: None,
                },
            },
            author: None,
            reviewers: serde_json::from_value(json!([
                {"user": {"name": "alice"}},
                {"user": {"name": "bob"}}
            ]))
            .unwrap(),
        },
    };

    client
        .add_default_reviewers(&settings, &pull_request)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("update request sent");
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    let names: BTreeSet<&str> = body["reviewers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["user"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, BTreeSet::from(["alice", "bob", "carol"]));
    // Existing reviewers survive, suggestions are unioned in, no duplicates.
    assert_eq!(body["reviewers"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn close_pr_failure_notifies_instead_of_propagating() {
    let server = MockServer::start().await;
    let (client, notifier) = client(&server.uri());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(409).set_body_string("version conflict"))
        .mount(&server)
        .await;

    let settings = bitbucket_settings(&server.uri());
    let pull_request = BitbucketPullRequestWrapper {
        search_host: SEARCH_HOST.to_string(),
        code_host: CODE_HOST.to_string(),
        pr: serde_json::from_value(pr_json(7)).unwrap(),
    };

    let result = client.close_pr(false, &settings, &pull_request).await;
    assert!(result.is_ok());
    assert_eq!(notifier.titles(), vec!["Failed declining PR"]);
}
