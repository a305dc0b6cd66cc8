//! Query layer: validating requests and turning crawls into responses
//!
//! A query names a root URL, how deep the crawl should go and how much of the
//! result the caller wants to see. [`Resolver`] answers it from the graph
//! store when possible and starts a crawl otherwise.

mod resolver;

pub use resolver::{ResolveSettings, Resolver};

use crate::page::{Depth, Page};
use crate::queue::QueueError;
use crate::storage::StoreError;
use crate::url::{clean_url, parse_start_url};
use crate::UrlError;
use serde::Serialize;
use thiserror::Error;

/// Display depth used when a request leaves it out
pub const DEFAULT_DISPLAY_DEPTH: u32 = 10;

/// Errors in a caller's request
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Invalid depth: {0}")]
    InvalidDepth(String),
}

/// Errors surfaced by [`Resolver::resolve`]
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Invalid(#[from] QueryError),

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Work queue unavailable: {0}")]
    QueueUnavailable(#[from] QueueError),
}

impl ResolveError {
    /// HTTP status an API layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Invalid(_) => 400,
            Self::StoreUnavailable(_) | Self::QueueUnavailable(_) => 503,
        }
    }
}

/// A validated crawl request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Root URL, without trailing slashes
    pub url: String,
    /// Total hops to crawl
    pub depth: Depth,
    /// Hops of the result the caller waits for and sees
    pub display_depth: Depth,
}

impl Query {
    /// Parses a request using the built-in default display depth
    pub fn parse(url: &str, depth: &str, display_depth: Option<&str>) -> Result<Self, QueryError> {
        Self::parse_with_default(url, depth, display_depth, DEFAULT_DISPLAY_DEPTH)
    }

    /// Parses a request
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute http(s) URL of the root page
    /// * `depth` - Integer hop count, `-1` for unbounded
    /// * `display_depth` - Hop count the caller wants back; absent or `0`
    ///   means `default_display`
    /// * `default_display` - Display depth used when none is given
    ///
    /// The display depth never exceeds a bounded `depth`.
    pub fn parse_with_default(
        url: &str,
        depth: &str,
        display_depth: Option<&str>,
        default_display: u32,
    ) -> Result<Self, QueryError> {
        parse_start_url(url)?;

        let depth = parse_depth(depth)?;
        let display = match display_depth.map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| QueryError::InvalidDepth(format!("display depth must be a non-negative integer, got '{}'", raw)))?,
        };
        let display = if display == 0 { default_display } else { display };

        let display_depth = Depth::Remaining(display).min(depth);

        Ok(Self {
            url: clean_url(url).to_string(),
            depth,
            display_depth,
        })
    }

    /// True if a stored result may answer this query without crawling
    pub fn is_bounded(&self) -> bool {
        matches!(self.depth, Depth::Remaining(_))
    }
}

fn parse_depth(raw: &str) -> Result<Depth, QueryError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| QueryError::InvalidDepth(format!("depth must be an integer, got '{}'", raw)))?;

    if value < Depth::UNBOUNDED {
        return Err(QueryError::InvalidDepth(format!(
            "depth must be -1 (unbounded) or non-negative, got {}",
            value
        )));
    }

    Ok(Depth::from(value))
}

/// Outcome of resolving a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A tree with at least one link below the root
    Found(Page),
    /// The root was never crawled, or was crawled but links nowhere
    NotFound,
    /// The crawl was started and the caller chose not to wait
    Pending,
}

impl Resolution {
    /// Found for a tree with links, NotFound otherwise
    pub fn from_optional(page: Option<Page>) -> Self {
        match page {
            Some(page) if !page.is_leaf() => Self::Found(page),
            _ => Self::NotFound,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Found(_) => 200,
            Self::NotFound => 404,
            Self::Pending => 202,
        }
    }

    pub fn page(&self) -> Option<&Page> {
        match self {
            Self::Found(page) => Some(page),
            _ => None,
        }
    }
}

/// Response body for a resolved query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub url: String,
    pub depth: Depth,
    pub display_depth: Depth,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Page>,
}

impl QueryResponse {
    pub fn new(query: &Query, resolution: Resolution) -> Self {
        let status_code = resolution.status_code();
        let results = match resolution {
            Resolution::Found(page) => Some(page),
            Resolution::NotFound | Resolution::Pending => None,
        };

        Self {
            url: query.url.clone(),
            depth: query.depth,
            display_depth: query.display_depth,
            status_code,
            results,
        }
    }

    /// Response for a request that failed
    pub fn from_error(query: &Query, error: &ResolveError) -> Self {
        Self {
            url: query.url.clone(),
            depth: query.depth,
            display_depth: query.display_depth,
            status_code: error.status_code(),
            results: None,
        }
    }
}
