//! End-to-end in-process crawls against a mock site

use crate::common;
use clamber::crawler::DepthSplit;
use clamber::page::{Depth, Page};
use clamber::storage::GraphStore;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_depth_one_crawl_persists_root_and_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&[
            "/page1",
            "/page2",
            "/page1#again",
            "https://elsewhere.example/x",
            "/logo.png",
        ]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(common::links(&["/deeper"]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(common::html("leaf"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deeper"))
        .respond_with(common::html("too deep"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, store) = common::crawler(dir.path());

    let crawl = crawler
        .crawl(Page::root(base.clone(), Depth::Remaining(1)), DepthSplit::Synchronous)
        .await;
    crawler.wait_for_writes(&crawl.scope).await;

    let root = crawl.root.expect("root should be crawled");
    assert_eq!(root.status_code, 200);
    assert_eq!(root.children.len(), 2);
    assert!(root.children.iter().all(|child| child.status_code == 200));
    assert!(root.children.iter().all(|child| child.children.is_empty()));

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.total_nodes, 3);
    assert_eq!(stats.total_links, 2);

    let tree = store
        .find_subgraph(&base, Depth::Remaining(1))
        .await
        .unwrap()
        .expect("root should be stored");
    assert_eq!(tree.status_code, 200);
    assert_eq!(tree.max_depth(), 1);

    let urls: Vec<_> = tree.links.iter().map(|node| node.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/page1", base), format!("{}/page2", base)]);
}

#[tokio::test]
async fn test_crawl_stops_at_requested_depth() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&["/level1"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level1"))
        .respond_with(common::links(&["/level2"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(common::links(&["/level3"]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level3"))
        .respond_with(common::html("never"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, store) = common::crawler(dir.path());

    let crawl = crawler
        .crawl(Page::root(base.clone(), Depth::Remaining(2)), DepthSplit::Synchronous)
        .await;
    crawler.wait_for_writes(&crawl.scope).await;

    assert_eq!(crawl.root.unwrap().max_depth(), 2);

    let tree = store
        .load_subgraph(&base, Depth::Unbounded)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tree.max_depth(), 2);
    assert_eq!(tree.node_count(), 3);
}

#[tokio::test]
async fn test_cycles_terminate() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&["/a"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(common::links(&["/", "/a"]))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, store) = common::crawler(dir.path());

    let crawl = tokio::time::timeout(
        Duration::from_secs(30),
        crawler.crawl(Page::root(base.clone(), Depth::Unbounded), DepthSplit::Synchronous),
    )
    .await
    .expect("crawl of a cycle should terminate");
    crawler.wait_for_writes(&crawl.scope).await;

    assert_eq!(crawl.scope.visited_count(), 2);

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.total_nodes, 2);
    // root -> a, a -> root, a -> a
    assert_eq!(stats.total_links, 3);
}

#[tokio::test]
async fn test_failed_children_do_not_abort_siblings() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&["/missing", "/broken", "/fine"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fine"))
        .respond_with(common::html("ok"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, store) = common::crawler(dir.path());

    let crawl = crawler
        .crawl(Page::root(base.clone(), Depth::Remaining(1)), DepthSplit::Synchronous)
        .await;
    crawler.wait_for_writes(&crawl.scope).await;

    let root = crawl.root.unwrap();
    let mut statuses: Vec<_> = root
        .children
        .iter()
        .map(|child| (child.url.trim_start_matches(&base).to_string(), child.status_code))
        .collect();
    statuses.sort();
    assert_eq!(
        statuses,
        vec![("/fine".to_string(), 200), ("/missing".to_string(), 404)]
    );

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.total_nodes, 3);
    assert_eq!(stats.nodes_by_status.get(&404), Some(&1));
    assert_eq!(stats.nodes_by_status.get(&500), None);
}

#[tokio::test]
async fn test_non_html_pages_are_not_parsed() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&["/feed"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"html": "<a href=\"/hidden\">x</a>"}"#, "application/json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(common::html("hidden"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, _store) = common::crawler(dir.path());

    let crawl = crawler
        .crawl(Page::root(base, Depth::Remaining(3)), DepthSplit::Synchronous)
        .await;
    crawler.wait_for_writes(&crawl.scope).await;

    let root = crawl.root.unwrap();
    assert_eq!(root.children.len(), 1);
    assert!(root.children[0].children.is_empty());
}

#[tokio::test]
async fn test_background_crawl_persists_beyond_display_tree() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&["/a"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(common::links(&["/b"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(common::links(&["/c"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(common::links(&["/d"]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(common::html("past the background budget"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, store) = common::crawler(dir.path());

    let split = DepthSplit::background(Depth::Remaining(2));
    let crawl = crawler
        .crawl(Page::root(base.clone(), Depth::Remaining(1)), split)
        .await;

    let root = crawl.root.expect("root should be crawled");
    assert_eq!(root.max_depth(), 1);
    assert!(root.children[0].children.is_empty());

    tokio::time::timeout(Duration::from_secs(30), async {
        crawl.scope.background().wait().await;
        crawl.scope.writes().wait().await;
    })
    .await
    .expect("background crawl should finish");

    let tree = store
        .load_subgraph(&base, Depth::Unbounded)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tree.max_depth(), 3);
    assert_eq!(tree.node_count(), 4);
}
