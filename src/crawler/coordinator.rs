//! Crawler coordinator - the per-hop crawl algorithm
//!
//! Every hop fetches one page, hands it to the graph store in a detached
//! task, and fans out to the page's links until the depth budget runs out or
//! the page was already visited in this crawl. Children either run as tasks
//! of this process or are published to the work queue for any worker.

use crate::config::Config;
use crate::crawler::fetcher::{is_html_content_type, FetchResult, Fetcher};
use crate::crawler::parser::extract_children;
use crate::crawler::persist;
use crate::crawler::scope::{CrawlScope, ScopeRegistry};
use crate::page::{Depth, Page};
use crate::queue::{QueueMessage, WorkQueue};
use crate::state::HopState;
use crate::storage::{GraphStore, NodeRecord};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Where the children of a hop are crawled
#[derive(Clone)]
pub enum Dispatch {
    /// Each child is a task of this process; the hop waits for all of them
    InProcess,
    /// Each child is published to the work queue
    Queue(Arc<dyn WorkQueue>),
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProcess => f.write_str("InProcess"),
            Self::Queue(_) => f.write_str("Queue"),
        }
    }
}

/// What happens once the caller-visible depth is used up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthSplit {
    /// The crawl stops at the display depth
    #[default]
    Synchronous,
    /// The crawl continues `depth` more hops in the background
    Background { depth: Depth },
}

impl DepthSplit {
    /// Background continuation for `depth` more hops, if any
    pub fn background(depth: Depth) -> Self {
        if depth.has_remaining() {
            Self::Background { depth }
        } else {
            Self::Synchronous
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Display,
    Background,
}

/// Result of an in-process crawl
#[derive(Debug)]
pub struct Crawl {
    /// The root page with its caller-visible subtree; `None` if the root
    /// could not be fetched at all
    pub root: Option<Page>,
    /// The crawl's scope, for joining its writes and background work
    pub scope: Arc<CrawlScope>,
}

/// Main crawler structure
#[derive(Clone)]
pub struct Crawler {
    fetcher: Fetcher,
    store: Arc<dyn GraphStore>,
    dispatch: Dispatch,
    scopes: Arc<ScopeRegistry>,
}

impl Crawler {
    /// Creates a crawler that fans out in-process
    pub fn new(fetcher: Fetcher, store: Arc<dyn GraphStore>) -> Self {
        Self {
            fetcher,
            store,
            dispatch: Dispatch::InProcess,
            scopes: Arc::new(ScopeRegistry::new(Duration::from_secs(600))),
        }
    }

    /// Publishes children to `queue` instead of crawling them in-process
    pub fn with_queue(mut self, queue: Arc<dyn WorkQueue>) -> Self {
        self.dispatch = Dispatch::Queue(queue);
        self
    }

    /// Forgets worker crawl scopes unused for `idle`
    pub fn with_scope_idle(mut self, idle: Duration) -> Self {
        self.scopes = Arc::new(ScopeRegistry::new(idle));
        self
    }

    /// Builds a crawler from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `store` - Graph store every hop writes to
    /// * `queue` - Work queue; when given, children are published to it
    pub fn from_config(
        config: &Config,
        store: Arc<dyn GraphStore>,
        queue: Option<Arc<dyn WorkQueue>>,
    ) -> Result<Self, reqwest::Error> {
        let fetcher = Fetcher::from_config(&config.http, &config.user_agent)?;
        let crawler = Self::new(fetcher, store).with_scope_idle(config.queue.scope_idle());
        Ok(match queue {
            Some(queue) => crawler.with_queue(queue),
            None => crawler,
        })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Crawls from `root` in a new scope
    ///
    /// Returns once the caller-visible part of the crawl is done. Writes and
    /// background work may still be running; see [`Crawler::wait_for_writes`].
    pub async fn crawl(&self, root: Page, split: DepthSplit) -> Crawl {
        let scope = CrawlScope::new(root.start_url.clone());
        tracing::info!(
            crawl_id = %scope.id(),
            "Starting crawl of {} (depth {}, split {:?})",
            root.url,
            root.depth,
            split
        );

        let root = self
            .visit(Arc::clone(&scope), root, Mode::Display, split)
            .await;

        tracing::info!(
            crawl_id = %scope.id(),
            visited = scope.visited_count(),
            "Finished crawl of {}",
            scope.start_url()
        );
        Crawl { root, scope }
    }

    /// Waits until every page of the caller-visible crawl is persisted
    pub async fn wait_for_writes(&self, scope: &CrawlScope) {
        scope.writes().wait().await;
    }

    /// Crawls the hop described by a queue message
    ///
    /// Hops of one crawl share a scope looked up by the crawl's start URL. A
    /// root message starts a fresh scope, so a repeated crawl of the same
    /// root is not cut short by the pages an earlier crawl visited.
    pub async fn handle_message(&self, message: QueueMessage) {
        let page = Page::from(message);
        if page.url.is_empty() {
            tracing::warn!("Ignoring queue message without a URL");
            return;
        }

        let scope = if page.is_crawl_root() {
            self.scopes.begin(&page.start_url)
        } else {
            self.scopes.scope_for(&page.start_url)
        };
        self.visit(scope, page, Mode::Display, DepthSplit::Synchronous)
            .await;
    }

    fn visit(
        &self,
        scope: Arc<CrawlScope>,
        page: Page,
        mode: Mode,
        split: DepthSplit,
    ) -> BoxFuture<'static, Option<Page>> {
        let crawler = self.clone();
        async move { crawler.hop(scope, page, mode, split).await }.boxed()
    }

    /// One page hop
    async fn hop(
        self,
        scope: Arc<CrawlScope>,
        mut page: Page,
        mode: Mode,
        split: DepthSplit,
    ) -> Option<Page> {
        tracing::debug!(
            crawl_id = %scope.id(),
            state = %HopState::Fetching,
            "Fetching {} (depth {})",
            page.url,
            page.depth
        );

        let fetched = self.fetcher.fetch(&page.url).await;
        page.touch();

        let (content_type, body) = match fetched {
            FetchResult::Success {
                status_code,
                content_type,
                body,
                ..
            } => {
                page.status_code = status_code;
                (content_type, body)
            }
            FetchResult::Terminal { status_code } => {
                page.status_code = status_code;
                self.persist(&scope, &page, mode);
                self.log_state(&scope, &page, HopState::NotFound);
                return Some(page);
            }
            FetchResult::Exhausted { .. } | FetchResult::Transport { .. } => {
                self.log_state(&scope, &page, HopState::Errored);
                return None;
            }
        };

        self.persist(&scope, &page, mode);

        if !scope.mark_visited(&page.url) {
            tracing::debug!(crawl_id = %scope.id(), "Already crawled {}", page.url);
            return Some(page);
        }

        let display_left = page.depth.has_remaining();
        let background = match (mode, split) {
            (Mode::Display, DepthSplit::Background { depth }) if depth.has_remaining() => {
                Some(depth)
            }
            _ => None,
        };

        if !display_left && background.is_none() {
            return Some(page);
        }

        if !is_html_content_type(&content_type) {
            self.log_state(&scope, &page, HopState::NonHtmlSkipped);
            return Some(page);
        }

        let mut children = extract_children(&page, &body);
        drop(body);
        self.log_state(&scope, &page, HopState::HtmlParsed);

        if display_left {
            let child_depth = page.depth.decrement();
            for child in &mut children {
                child.depth = child_depth;
            }

            match (&self.dispatch, mode) {
                (Dispatch::Queue(queue), _) => publish_children(queue.as_ref(), &children).await,
                (Dispatch::InProcess, Mode::Display) => {
                    page.children = self.fan_out(&scope, children, split).await;
                }
                (Dispatch::InProcess, Mode::Background) => {
                    for child in children {
                        let hop = self.visit(Arc::clone(&scope), child, Mode::Background, split);
                        scope.background().spawn(hop.map(drop));
                    }
                }
            }
        } else if let Some(depth) = background {
            self.start_background(&scope, children, depth.decrement(), split);
        }

        Some(page)
    }

    /// Crawls every child as its own task and collects them as they finish
    async fn fan_out(&self, scope: &Arc<CrawlScope>, children: Vec<Page>, split: DepthSplit) -> Vec<Page> {
        let mut set = JoinSet::new();
        for child in children {
            set.spawn(self.visit(Arc::clone(scope), child, Mode::Display, split));
        }

        let mut visited = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(child)) => visited.push(child),
                Ok(None) => {}
                Err(e) => tracing::error!(crawl_id = %scope.id(), "Child crawl task failed: {}", e),
            }
        }
        visited
    }

    /// Continues below a display leaf without blocking the caller
    fn start_background(
        &self,
        scope: &Arc<CrawlScope>,
        children: Vec<Page>,
        depth: Depth,
        split: DepthSplit,
    ) {
        for mut child in children {
            child.depth = depth;
            let hop = self.visit(Arc::clone(scope), child, Mode::Background, split);
            scope.background().spawn(hop.map(drop));
        }

        if scope.start_background() {
            tracing::info!(
                crawl_id = %scope.id(),
                start_url = scope.start_url(),
                "Initiating background crawl"
            );
            self.watch_background(Arc::clone(scope));
        }
    }

    /// Logs how deep the whole crawl went once its background work is done
    fn watch_background(&self, scope: Arc<CrawlScope>) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            scope.background().wait().await;
            scope.writes().wait().await;

            match store.load_subgraph(scope.start_url(), Depth::Unbounded).await {
                Ok(Some(tree)) => tracing::info!(
                    crawl_id = %scope.id(),
                    start_url = scope.start_url(),
                    crawled_depth = tree.max_depth(),
                    pages = tree.node_count(),
                    "Finished background crawl"
                ),
                Ok(None) => tracing::warn!(
                    crawl_id = %scope.id(),
                    "Background crawl finished but {} was never stored",
                    scope.start_url()
                ),
                Err(e) => tracing::error!(
                    crawl_id = %scope.id(),
                    "Could not find total depth crawled for {}: {}",
                    scope.start_url(),
                    e
                ),
            }
        });
    }

    /// Writes the page (and its parent edge) in a task tracked by the scope
    fn persist(&self, scope: &Arc<CrawlScope>, page: &Page, mode: Mode) {
        if page.url.is_empty() {
            tracing::warn!(crawl_id = %scope.id(), "Not persisting a page without a URL");
            return;
        }

        let store = Arc::clone(&self.store);
        let node = NodeRecord::from(page);
        let parent = page.parent.as_ref().map(NodeRecord::from);
        let crawl_id = scope.id();

        let group = match mode {
            Mode::Display => scope.writes(),
            Mode::Background => scope.background(),
        };

        group.spawn(async move {
            match persist::create(store.as_ref(), &node, parent.as_ref()).await {
                Ok(uid) => tracing::trace!(
                    crawl_id = %crawl_id,
                    uid = %uid,
                    state = %HopState::Persisted,
                    "Persisted {}",
                    node.url
                ),
                Err(e) => tracing::error!(
                    crawl_id = %crawl_id,
                    "Failed to persist {}: {}",
                    node.url,
                    e
                ),
            }
        });
    }

    fn log_state(&self, scope: &CrawlScope, page: &Page, state: HopState) {
        if state.is_error() {
            tracing::debug!(
                crawl_id = %scope.id(),
                state = %state,
                status_code = page.status_code,
                "Stopping at {}",
                page.url
            );
        } else {
            tracing::debug!(crawl_id = %scope.id(), state = %state, "{}", page.url);
        }
    }
}

/// Publishes every child to the work queue concurrently
async fn publish_children(queue: &dyn WorkQueue, children: &[Page]) {
    let results = join_all(children.iter().map(|child| queue.publish(child))).await;
    for (child, result) in children.iter().zip(results) {
        if let Err(e) = result {
            tracing::error!("Failed to publish {}: {}", child.url, e);
        }
    }
}
