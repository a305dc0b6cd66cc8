//! Per-crawl state: dedup set and task groups
//!
//! A crawl scope lives for one root crawl. Queue workers see the hops of many
//! crawls interleaved, so they keep scopes in a [`ScopeRegistry`] keyed by the
//! crawl's start URL and forget scopes that have gone quiet.

use crate::crawler::tasks::TaskGroup;
use crate::url::clean_url;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// State shared by every hop of one crawl
#[derive(Debug)]
pub struct CrawlScope {
    id: Uuid,
    start_url: String,
    visited: Mutex<HashSet<String>>,
    writes: Arc<TaskGroup>,
    background: Arc<TaskGroup>,
    background_started: AtomicBool,
}

impl CrawlScope {
    pub fn new(start_url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            start_url: start_url.into(),
            visited: Mutex::new(HashSet::new()),
            writes: TaskGroup::new(),
            background: TaskGroup::new(),
            background_started: AtomicBool::new(false),
        })
    }

    /// Identifier used to correlate log lines of one crawl
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Records a visit to `url`
    ///
    /// Returns true the first time a URL is seen in this scope and false on
    /// every later call. URLs differing only by a trailing slash are the same.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(clean_url(url).to_string())
    }

    /// Number of distinct URLs visited so far
    pub fn visited_count(&self) -> usize {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Persistence tasks of the caller-visible crawl
    pub fn writes(&self) -> &Arc<TaskGroup> {
        &self.writes
    }

    /// Background crawl tasks, including their persistence
    pub fn background(&self) -> &Arc<TaskGroup> {
        &self.background
    }

    /// Returns true for the first caller only
    pub(crate) fn start_background(&self) -> bool {
        !self.background_started.swap(true, Ordering::SeqCst)
    }
}

/// Scope and last use, keyed by cleaned start URL
type ScopeMap = HashMap<String, (Arc<CrawlScope>, Instant)>;

/// Crawl scopes of a long-running worker, keyed by start URL
#[derive(Debug)]
pub struct ScopeRegistry {
    scopes: Mutex<ScopeMap>,
    idle_ttl: Duration,
}

impl ScopeRegistry {
    /// Creates a registry that forgets scopes unused for `idle_ttl`
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            scopes: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Returns the scope of the crawl started at `start_url`, creating it if
    /// needed
    pub fn scope_for(&self, start_url: &str) -> Arc<CrawlScope> {
        let now = Instant::now();
        let mut scopes = self.lock_pruned(now);

        let key = clean_url(start_url).to_string();
        let (scope, last_used) = scopes
            .entry(key)
            .or_insert_with(|| (CrawlScope::new(start_url), now));
        *last_used = now;
        Arc::clone(scope)
    }

    /// Starts a new crawl at `start_url`
    ///
    /// Any scope left over from an earlier crawl of the same root is replaced,
    /// so the new crawl revisits pages the earlier one already saw. Hops of
    /// the earlier crawl still in flight join the new scope.
    pub fn begin(&self, start_url: &str) -> Arc<CrawlScope> {
        let now = Instant::now();
        let mut scopes = self.lock_pruned(now);

        let scope = CrawlScope::new(start_url);
        let key = clean_url(start_url).to_string();
        if let Some((old, _)) = scopes.insert(key, (Arc::clone(&scope), now)) {
            tracing::debug!(
                "Crawl {} of {} replaces crawl {}",
                scope.id(),
                start_url,
                old.id()
            );
        }
        scope
    }

    fn lock_pruned(&self, now: Instant) -> MutexGuard<'_, ScopeMap> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);

        let before = scopes.len();
        scopes.retain(|_, (_, last_used)| now.duration_since(*last_used) < self.idle_ttl);
        let pruned = before - scopes.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} idle crawl scopes", pruned);
        }
        scopes
    }
}
