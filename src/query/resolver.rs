//! Resolving queries against the store and the crawler

use crate::config::Config;
use crate::crawler::{Crawler, DepthSplit, Dispatch, TaskGroup};
use crate::page::{Depth, Page};
use crate::query::{Query, Resolution, ResolveError};
use crate::storage::{GraphStore, StoreError, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Knobs for [`Resolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSettings {
    /// Wait for the crawl before answering
    pub wait_crawl: bool,
    /// Delay between store reads while waiting on queue workers
    pub poll_interval: Duration,
    /// How long a polled result must stay unchanged to be final
    pub settle_window: Duration,
    /// Extra background hops past the display depth
    pub background_depth: Depth,
}

impl ResolveSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            wait_crawl: config.crawler.wait_crawl,
            poll_interval: config.query.poll_interval(),
            settle_window: config.query.settle_window(),
            background_depth: config.crawler.background_depth(),
        }
    }
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            wait_crawl: true,
            poll_interval: Duration::from_millis(100),
            settle_window: Duration::from_secs(3),
            background_depth: Depth::Remaining(0),
        }
    }
}

/// Answers queries, crawling when the store cannot
#[derive(Clone)]
pub struct Resolver {
    crawler: Crawler,
    store: Arc<dyn GraphStore>,
    settings: ResolveSettings,
    crawls: Arc<TaskGroup>,
}

impl Resolver {
    pub fn new(crawler: Crawler, settings: ResolveSettings) -> Self {
        let store = Arc::clone(crawler.store());
        Self {
            crawler,
            store,
            settings,
            crawls: TaskGroup::new(),
        }
    }

    pub fn from_config(crawler: Crawler, config: &Config) -> Self {
        Self::new(crawler, ResolveSettings::from_config(config))
    }

    /// Waits for every in-process crawl this resolver started, background
    /// hops and writes included
    pub async fn drain(&self) {
        self.crawls.wait().await;
    }

    /// Resolves a query
    ///
    /// A bounded query is first answered from the store. When the stored tree
    /// is missing or too shallow a crawl is started: published to the work
    /// queue with the full depth, or run in-process with the display depth in
    /// the foreground and the rest in the background.
    ///
    /// Every answer is cut at the display depth, whichever path produced it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the queue cannot be reached. Failures
    /// of individual pages never surface here.
    pub async fn resolve(&self, query: &Query) -> Result<Resolution, ResolveError> {
        if query.is_bounded() {
            match self.store.find_subgraph(&query.url, query.depth).await {
                Ok(Some(node)) => {
                    tracing::info!(
                        "Found {} in the store (depth {})",
                        query.url,
                        node.max_depth()
                    );
                    let node = if query.display_depth == query.depth {
                        Some(node)
                    } else {
                        self.store
                            .load_subgraph(&query.url, query.display_depth)
                            .await?
                    };
                    return Ok(Resolution::from_optional(node.map(Page::from)));
                }
                Ok(None) => tracing::debug!("{} not in the store yet", query.url),
                Err(StoreError::DepthMismatch { requested, reached, .. }) => tracing::info!(
                    "Stored tree for {} reaches depth {}, {} requested; crawling",
                    query.url,
                    reached,
                    requested
                ),
                Err(e) => return Err(e.into()),
            }
        }

        match self.crawler.dispatch() {
            Dispatch::Queue(queue) => {
                let root = Page::root(query.url.clone(), query.depth);
                let id = queue.publish(&root).await?;
                tracing::info!(message_id = id, "Queued crawl of {} (depth {})", query.url, query.depth);

                if !self.settings.wait_crawl {
                    return Ok(Resolution::Pending);
                }

                let result = self
                    .poll_for_finished_crawl(&query.url, query.display_depth)
                    .await?;
                Ok(Resolution::from_optional(result))
            }
            Dispatch::InProcess => {
                let root = Page::root(query.url.clone(), query.display_depth);
                let split = self.split_for(query);

                if !self.settings.wait_crawl {
                    let crawler = self.crawler.clone();
                    self.crawls.spawn(async move {
                        let crawl = crawler.crawl(root, split).await;
                        crawl.scope.writes().wait().await;
                        crawl.scope.background().wait().await;
                    });
                    return Ok(Resolution::Pending);
                }

                let crawl = self.crawler.crawl(root, split).await;
                self.crawler.wait_for_writes(&crawl.scope).await;

                let scope = Arc::clone(&crawl.scope);
                self.crawls.spawn(async move { scope.background().wait().await });

                Ok(Resolution::from_optional(crawl.root))
            }
        }
    }

    /// Background continuation for an in-process crawl of `query`
    ///
    /// Covers whatever the requested depth leaves past the display depth, or
    /// the configured background depth if that is larger.
    pub fn split_for(&self, query: &Query) -> DepthSplit {
        let remainder = query.depth.beyond(query.display_depth);
        DepthSplit::background(remainder.max(self.settings.background_depth))
    }

    /// Polls the store until the crawl of `url` looks finished
    ///
    /// Stops as soon as the stored tree reaches `display_depth`, or once the
    /// tree has not changed for the settle window. Conflicting reads are
    /// retried on the next poll.
    async fn poll_for_finished_crawl(
        &self,
        url: &str,
        display_depth: Depth,
    ) -> StoreResult<Option<Page>> {
        let mut latest: Option<Page> = None;
        let mut latest_json: Option<String> = None;
        let mut changed_at = Instant::now();

        loop {
            tokio::time::sleep(self.settings.poll_interval).await;

            let candidate = match self.store.find_subgraph(url, display_depth).await {
                Ok(Some(node)) if matches!(display_depth, Depth::Remaining(_)) => {
                    tracing::debug!("Crawl of {} reached depth {}", url, node.max_depth());
                    return Ok(Some(Page::from(node)));
                }
                Ok(found) => found.map(Page::from),
                Err(StoreError::DepthMismatch { partial, .. }) => Some(Page::from(*partial)),
                Err(e) if e.is_conflict() => {
                    tracing::debug!("Conflicting read while polling {}: {}", url, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let json = candidate
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            if json != latest_json {
                latest_json = json;
                latest = candidate;
                changed_at = Instant::now();
            } else if changed_at.elapsed() >= self.settings.settle_window {
                tracing::debug!(
                    "Crawl of {} settled after {:?} without changes",
                    url,
                    self.settings.settle_window
                );
                return Ok(latest);
            }
        }
    }
}
