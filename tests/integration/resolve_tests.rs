//! Resolving queries in-process and through the work queue

use crate::common;
use clamber::crawler::{run_worker, Crawler};
use clamber::page::Depth;
use clamber::query::{Query, Resolution, ResolveSettings, Resolver};
use clamber::queue::{ConsumerSettings, WorkQueue};
use clamber::storage::GraphStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

async fn mount_small_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&["/a", "/b"]))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(common::html("a"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(common::html("b"))
        .mount(server)
        .await;
}

fn quick_settings() -> ResolveSettings {
    ResolveSettings {
        poll_interval: Duration::from_millis(20),
        settle_window: Duration::from_millis(300),
        ..ResolveSettings::default()
    }
}

#[tokio::test]
async fn test_in_process_resolve_returns_tree() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = TempDir::new().unwrap();
    let (crawler, _store) = common::crawler(dir.path());
    let resolver = Resolver::new(crawler, quick_settings());

    let query = Query::parse(&server.uri(), "1", None).unwrap();
    let resolution = resolver.resolve(&query).await.unwrap();

    assert_eq!(resolution.status_code(), 200);
    let root = resolution.page().unwrap();
    assert_eq!(root.status_code, 200);
    assert_eq!(root.children.len(), 2);
}

#[tokio::test]
async fn test_stored_result_skips_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(common::links(&["/a"]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(common::html("a"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, _store) = common::crawler(dir.path());
    let resolver = Resolver::new(crawler, quick_settings());
    let query = Query::parse(&server.uri(), "1", None).unwrap();

    let first = resolver.resolve(&query).await.unwrap();
    let second = resolver.resolve(&query).await.unwrap();

    assert_eq!(first.status_code(), 200);
    assert_eq!(second.status_code(), 200);
    assert_eq!(second.page().unwrap().children[0].url, format!("{}/a", server.uri()));
}

#[tokio::test]
async fn test_unreachable_root_is_not_found() {
    let dir = TempDir::new().unwrap();
    let (crawler, _store) = common::crawler(dir.path());
    let resolver = Resolver::new(crawler, quick_settings());

    let query = Query::parse("http://nonexistent.invalid", "2", None).unwrap();
    let resolution = tokio::time::timeout(Duration::from_secs(30), resolver.resolve(&query))
        .await
        .expect("resolve should not hang")
        .unwrap();

    assert_eq!(resolution, Resolution::NotFound);
}

#[tokio::test]
async fn test_queue_resolve_without_workers_settles_to_not_found() {
    let dir = TempDir::new().unwrap();
    let (crawler, _store) = common::crawler(dir.path());
    let queue = common::queue(dir.path(), Duration::ZERO);
    let resolver = Resolver::new(crawler.with_queue(queue.clone()), quick_settings());

    let query = Query::parse("https://example.com", "2", None).unwrap();
    let resolution = tokio::time::timeout(Duration::from_secs(10), resolver.resolve(&query))
        .await
        .expect("resolve should settle")
        .unwrap();

    assert_eq!(resolution, Resolution::NotFound);
    assert_eq!(queue.pending().await.unwrap(), 1);
}

#[tokio::test]
async fn test_queue_resolve_with_worker() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = TempDir::new().unwrap();
    let store = common::store(dir.path());
    let queue: Arc<dyn WorkQueue> = common::queue(dir.path(), Duration::ZERO);

    let worker_crawler = Crawler::new(common::fetcher(2), store.clone()).with_queue(Arc::clone(&queue));
    let worker = tokio::spawn(run_worker(
        worker_crawler,
        Arc::clone(&queue),
        ConsumerSettings {
            consumers: 2,
            max_receive: 4,
            wait: Duration::from_millis(100),
        },
    ));

    let resolver_crawler = Crawler::new(common::fetcher(2), store.clone()).with_queue(Arc::clone(&queue));
    let resolver = Resolver::new(resolver_crawler, quick_settings());

    let query = Query::parse(&server.uri(), "1", None).unwrap();
    let resolution = tokio::time::timeout(Duration::from_secs(30), resolver.resolve(&query))
        .await
        .expect("resolve should finish")
        .unwrap();

    let root = resolution.page().expect("crawl should be found");
    assert_eq!(root.status_code, 200);
    assert!(!root.children.is_empty());

    tokio::time::timeout(Duration::from_secs(30), async {
        while store.statistics().await.unwrap().total_links < 2 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("both links should be stored");

    worker.abort();
}

#[tokio::test]
async fn test_queue_resolve_deeper_after_shallow() {
    let server = MockServer::start().await;
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
        .respond_with(common::html("b"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = common::store(dir.path());
    let queue: Arc<dyn WorkQueue> = common::queue(dir.path(), Duration::ZERO);

    let worker_crawler = Crawler::new(common::fetcher(2), store.clone()).with_queue(Arc::clone(&queue));
    let worker = tokio::spawn(run_worker(
        worker_crawler,
        Arc::clone(&queue),
        ConsumerSettings {
            consumers: 1,
            max_receive: 4,
            wait: Duration::from_millis(100),
        },
    ));

    let resolver_crawler = Crawler::new(common::fetcher(2), store.clone()).with_queue(Arc::clone(&queue));
    let resolver = Resolver::new(resolver_crawler, quick_settings());

    let shallow = Query::parse(&server.uri(), "1", None).unwrap();
    let first = tokio::time::timeout(Duration::from_secs(30), resolver.resolve(&shallow))
        .await
        .expect("shallow resolve should finish")
        .unwrap();
    assert_eq!(first.page().expect("shallow crawl found").max_depth(), 1);

    let deep = Query::parse(&server.uri(), "2", None).unwrap();
    let second = tokio::time::timeout(Duration::from_secs(30), resolver.resolve(&deep))
        .await
        .expect("deep resolve should finish")
        .unwrap();
    assert_eq!(second.page().expect("deep crawl found").max_depth(), 2);

    let requests = server.received_requests().await.unwrap();
    let fetched = |p: &str| requests.iter().filter(|r| r.url.path() == p).count();
    assert_eq!(fetched("/"), 2);
    assert_eq!(fetched("/a"), 2);
    assert_eq!(fetched("/b"), 1);

    worker.abort();
}

#[tokio::test]
async fn test_pending_when_not_waiting() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = TempDir::new().unwrap();
    let (crawler, store) = common::crawler(dir.path());
    let settings = ResolveSettings {
        wait_crawl: false,
        ..quick_settings()
    };
    let resolver = Resolver::new(crawler, settings);

    let query = Query::parse(&server.uri(), "1", None).unwrap();
    let resolution = resolver.resolve(&query).await.unwrap();
    assert_eq!(resolution, Resolution::Pending);
    assert_eq!(resolution.status_code(), 202);

    tokio::time::timeout(Duration::from_secs(30), resolver.drain())
        .await
        .expect("crawl should finish");

    let tree = store
        .find_subgraph(&server.uri(), Depth::Remaining(1))
        .await
        .unwrap()
        .expect("crawl should be stored");
    assert_eq!(tree.links.len(), 2);
}

#[tokio::test]
async fn test_deeper_request_continues_in_background() {
    let server = MockServer::start().await;
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
        .respond_with(common::html("b"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, store) = common::crawler(dir.path());
    let resolver = Resolver::new(crawler, quick_settings());

    let query = Query::parse(&server.uri(), "2", Some("1")).unwrap();
    let resolution = resolver.resolve(&query).await.unwrap();
    assert_eq!(resolution.page().unwrap().max_depth(), 1);

    tokio::time::timeout(Duration::from_secs(30), resolver.drain())
        .await
        .expect("background crawl should finish");

    let tree = store
        .find_subgraph(&server.uri(), Depth::Remaining(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tree.max_depth(), 2);
}
