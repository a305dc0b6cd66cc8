//! Shared helpers for the integration tests

use clamber::config::UserAgentConfig;
use clamber::crawler::{build_http_client, Crawler, Fetcher};
use clamber::queue::SqliteQueue;
use clamber::storage::SqliteGraphStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::ResponseTemplate;

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Fetcher with a short back-off so retry tests stay fast
pub fn fetcher(max_attempts: u32) -> Fetcher {
    let client = build_http_client(&user_agent(), Duration::from_secs(5)).expect("Failed to build client");
    Fetcher::new(client, max_attempts, Duration::from_millis(10))
}

pub fn store(dir: &Path) -> Arc<SqliteGraphStore> {
    let store = SqliteGraphStore::open(&dir.join("graph.db"), Duration::from_millis(250))
        .expect("Failed to open graph store");
    Arc::new(store)
}

pub fn queue(dir: &Path, publish_delay: Duration) -> Arc<SqliteQueue> {
    let queue = SqliteQueue::open(
        &dir.join("queue.db"),
        Duration::from_millis(250),
        publish_delay,
        Duration::from_millis(20),
    )
    .expect("Failed to open queue");
    Arc::new(queue)
}

pub fn crawler(dir: &Path) -> (Crawler, Arc<SqliteGraphStore>) {
    let store = store(dir);
    (Crawler::new(fetcher(2), store.clone()), store)
}

/// A 200 response carrying an HTML body
pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

/// An HTML body linking to each of `paths`
pub fn links(paths: &[&str]) -> ResponseTemplate {
    let anchors: String = paths
        .iter()
        .map(|path| format!(r#"<a href="{}">{}</a>"#, path, path))
        .collect();
    html(&anchors)
}
