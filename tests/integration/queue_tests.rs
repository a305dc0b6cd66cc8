//! Work queue delivery semantics

use crate::common;
use clamber::page::{Depth, Page};
use clamber::queue::{spawn_consumers, ConsumerSettings, QueueMessage, WorkQueue};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn child_page() -> Page {
    let mut root = Page::root("https://example.com", Depth::Remaining(2));
    root.status_code = 200;
    let mut child = Page::child_of(&root, "https://example.com/a");
    child.depth = Depth::Remaining(1);
    child
}

#[tokio::test]
async fn test_publish_delay_is_respected() {
    let dir = TempDir::new().unwrap();
    let queue = common::queue(dir.path(), Duration::from_millis(400));

    queue.publish(&child_page()).await.unwrap();

    let early = queue.receive(10, Duration::from_millis(50)).await.unwrap();
    assert!(early.is_empty());
    assert_eq!(queue.pending().await.unwrap(), 1);

    let late = queue.receive(10, Duration::from_secs(5)).await.unwrap();
    assert_eq!(late.len(), 1);
}

#[tokio::test]
async fn test_messages_are_deleted_on_receipt() {
    let dir = TempDir::new().unwrap();
    let queue = common::queue(dir.path(), Duration::ZERO);

    queue.publish(&child_page()).await.unwrap();

    let first = queue.receive(10, Duration::from_secs(1)).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(queue.pending().await.unwrap(), 0);

    let second = queue.receive(10, Duration::from_millis(100)).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_message_shape() {
    let dir = TempDir::new().unwrap();
    let queue = common::queue(dir.path(), Duration::ZERO);

    queue.publish(&child_page()).await.unwrap();
    let message = queue
        .receive(1, Duration::from_secs(1))
        .await
        .unwrap()
        .pop()
        .expect("one message");

    assert_eq!(message.url, "https://example.com/a");
    assert_eq!(message.depth, Depth::Remaining(1));
    assert_eq!(message.start_url, "https://example.com");

    let parent = message.parent.as_ref().expect("parent snapshot");
    assert_eq!(parent.url, "https://example.com");
    assert_eq!(parent.depth, Depth::Remaining(2));

    let json = serde_json::to_value(&message).unwrap();
    let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["depth", "parent", "start_url", "timestamp", "url"]);
    assert_eq!(json["parent"]["depth"], 2);

    let page = Page::from(message);
    assert_eq!(page.parent.unwrap().status_code, 200);
}

#[tokio::test]
async fn test_unbounded_depth_travels_as_minus_one() {
    let dir = TempDir::new().unwrap();
    let queue = common::queue(dir.path(), Duration::ZERO);

    queue
        .publish(&Page::root("https://example.com", Depth::Unbounded))
        .await
        .unwrap();
    let message: QueueMessage = queue
        .receive(1, Duration::from_secs(1))
        .await
        .unwrap()
        .pop()
        .unwrap();

    assert_eq!(message.depth, Depth::Unbounded);
    assert_eq!(serde_json::to_value(&message).unwrap()["depth"], -1);
    assert!(message.parent.is_none());
}

#[tokio::test]
async fn test_consumers_deliver_each_message_once() {
    let dir = TempDir::new().unwrap();
    let queue = common::queue(dir.path(), Duration::ZERO);

    for i in 0..12 {
        let page = Page::root(format!("https://example.com/{}", i), Depth::Remaining(0));
        queue.publish(&page).await.unwrap();
    }

    let settings = ConsumerSettings {
        consumers: 3,
        max_receive: 4,
        wait: Duration::from_millis(100),
    };
    let queue: Arc<dyn WorkQueue> = queue;
    let mut rx = spawn_consumers(Arc::clone(&queue), settings);

    let mut urls = Vec::new();
    while urls.len() < 12 {
        let message = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("messages should arrive")
            .expect("consumers should be running");
        urls.push(message.url);
    }
    drop(rx);

    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 12);
    assert_eq!(queue.pending().await.unwrap(), 0);
}
