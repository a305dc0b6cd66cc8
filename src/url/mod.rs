//! URL handling module for Clamber
//!
//! This module provides link normalization and the classification rules that
//! decide whether an extracted `href` is followed at all.

mod normalize;

use regex::Regex;
use std::sync::LazyLock;

// Re-export main functions
pub use normalize::{clean_url, normalize, parse_start_url};

static ABSOLUTE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+:)?//").expect("valid absolute-link pattern"));

static FILE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[A-Za-z0-9]+$").expect("valid extension pattern"));

/// Returns true when the href is relative to the page it was found on
///
/// Anything starting with `//` or `scheme://` is absolute and is not followed.
pub fn is_relative(href: &str) -> bool {
    !ABSOLUTE_LINK.is_match(href)
}

/// Returns true when the href looks like an HTML document
///
/// Paths ending in `.html` are crawlable, any other file extension is not,
/// and extension-less paths are assumed to be pages.
///
/// # Examples
///
/// ```
/// use clamber::url::is_crawlable;
///
/// assert!(is_crawlable("/about.html"));
/// assert!(is_crawlable("/about"));
/// assert!(!is_crawlable("/logo.png"));
/// ```
pub fn is_crawlable(href: &str) -> bool {
    if href.ends_with(".html") {
        return true;
    }
    !FILE_EXTENSION.is_match(href)
}
