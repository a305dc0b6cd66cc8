//! Find-or-create under concurrent writers

use crate::common;
use clamber::crawler::persist;
use clamber::page::Depth;
use clamber::storage::{GraphStore, NodeRecord};
use std::sync::Arc;
use tempfile::TempDir;

fn record(url: &str) -> NodeRecord {
    NodeRecord {
        url: url.to_string(),
        timestamp: 1_700_000_000,
        status_code: 200,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_node_creation_yields_one_node() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn GraphStore> = common::store(dir.path());

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            persist::find_or_create_node(store.as_ref(), &record("https://example.com/x")).await
        }));
    }

    let mut uids = Vec::new();
    for handle in handles {
        uids.push(handle.await.unwrap().unwrap());
    }
    uids.dedup();
    assert_eq!(uids.len(), 1);

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.total_nodes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edge_creation_yields_one_edge() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn GraphStore> = common::store(dir.path());

    let parent = store
        .find_or_create_node(&record("https://example.com"))
        .await
        .unwrap();
    let child = store
        .find_or_create_node(&record("https://example.com/a"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            persist::find_or_create_edge(store.as_ref(), parent, child).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    assert!(store.check_edge(parent, child).await.unwrap());
    assert!(!store.check_edge(child, parent).await.unwrap());
    assert_eq!(store.statistics().await.unwrap().total_links, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_of_one_page() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn GraphStore> = common::store(dir.path());

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let child = record(&format!("https://example.com/{}", i % 4));
            persist::create(store.as_ref(), &child, Some(&record("https://example.com"))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.total_nodes, 5);
    assert_eq!(stats.total_links, 4);

    let tree = store
        .find_subgraph("https://example.com", Depth::Remaining(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tree.links.len(), 4);
}
