//! Crawl-time page model
//!
//! A [`Page`] is the in-memory tree the orchestrator builds while crawling.
//! Each page only knows a one-hop snapshot of its parent, so trees are owned
//! top-down and can be moved between tasks freely.

mod depth;

pub use depth::Depth;

use crate::url::clean_url;
use serde::Serialize;

/// A page visited (or about to be visited) during a crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub url: String,

    #[serde(skip)]
    pub parent: Option<ParentLink>,

    #[serde(skip)]
    pub depth: Depth,

    #[serde(skip)]
    pub start_url: String,

    #[serde(skip_serializing_if = "is_zero_i64")]
    pub timestamp: i64,

    #[serde(skip_serializing_if = "is_zero_u16")]
    pub status_code: u16,

    #[serde(rename = "links", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Page>,
}

/// Detached snapshot of the page a link was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub url: String,
    pub depth: Depth,
    pub start_url: String,
    pub timestamp: i64,
    pub status_code: u16,
}

impl Page {
    /// Creates the root page of a new crawl
    pub fn root(url: impl Into<String>, depth: Depth) -> Self {
        let url = url.into();
        Self {
            start_url: url.clone(),
            url,
            parent: None,
            depth,
            timestamp: now(),
            status_code: 0,
            children: Vec::new(),
        }
    }

    /// Creates a page for a link found on `parent`
    ///
    /// The child's depth is left at zero; the orchestrator assigns it.
    pub fn child_of(parent: &Page, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent: Some(parent.link()),
            depth: Depth::default(),
            start_url: parent.start_url.clone(),
            timestamp: now(),
            status_code: 0,
            children: Vec::new(),
        }
    }

    /// One-hop snapshot of this page for its children
    pub fn link(&self) -> ParentLink {
        ParentLink {
            url: self.url.clone(),
            depth: self.depth,
            start_url: self.start_url.clone(),
            timestamp: self.timestamp,
            status_code: self.status_code,
        }
    }

    /// Refreshes the timestamp after a fetch
    pub fn touch(&mut self) {
        self.timestamp = now();
    }

    /// Number of hops from this page to its deepest descendant
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.max_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Returns true if the page was crawled but nothing hangs off it
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true for the first hop of a crawl
    pub fn is_crawl_root(&self) -> bool {
        self.parent.is_none() && clean_url(&self.url) == clean_url(&self.start_url)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

fn is_zero_u16(value: &u16) -> bool {
    *value == 0
}
