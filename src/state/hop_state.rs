//! Hop state definitions for tracking a single page visit
//!
//! Every visit of a page moves through these states once. They are only used
//! for logging; nothing about a hop's state is persisted.
use std::fmt;

/// Represents how far a single page-hop has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HopState {
    // ===== Active States =====
    /// Page is currently being fetched
    Fetching,

    /// Page was fetched as HTML and its links were extracted
    HtmlParsed,

    // ===== Terminal States =====
    /// Page answered with a non-retryable error status (usually 4xx)
    NotFound,

    /// Page could not be fetched (transport error or retries exhausted)
    Errored,

    /// Page was fetched but its Content-Type is not HTML
    NonHtmlSkipped,

    /// Page (and its parent edge, if any) has been written to the graph store
    Persisted,
}

impl HopState {
    /// Returns true if this represents a failed fetch
    pub fn is_error(&self) -> bool {
        matches!(self, Self::NotFound | Self::Errored)
    }

    /// Stable string form used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::HtmlParsed => "html_parsed",
            Self::NotFound => "not_found",
            Self::Errored => "errored",
            Self::NonHtmlSkipped => "non_html_skipped",
            Self::Persisted => "persisted",
        }
    }
}

impl fmt::Display for HopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
