//! HTML parser for extracting the links a crawl follows
//!
//! Only same-site links are followed: an `href` must be relative and must
//! look like an HTML document before it becomes a child page.

use crate::page::Page;
use crate::url::{is_crawlable, is_relative, normalize};
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Extracts the normalized links to follow from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags whose href is relative and crawlable
///
/// **Exclude:**
/// - Absolute and protocol-relative links (`https://…`, `//…`)
/// - Paths with a non-HTML file extension (`.png`, `.pdf`, …)
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
///
/// Each distinct normalized URL appears once, in discovery order.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - URL of the page, used as the base for relative links
///
/// # Example
///
/// ```
/// use clamber::crawler::extract_links;
///
/// let html = r#"<a href="/a">A</a><a href="/a#top">A again</a><a href="/logo.png">img</a>"#;
/// let links = extract_links(html, "https://example.com/page");
/// assert_eq!(links, vec!["https://example.com/a".to_string()]);
/// ```
pub fn extract_links(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };

            if let Some(url) = resolve_link(href, page_url) {
                if seen.insert(url.clone()) {
                    links.push(url);
                }
            }
        }
    }

    links
}

/// Builds the child pages for every link followed from `page`
///
/// Children inherit the crawl's start URL and carry a snapshot of `page` as
/// their parent. Their depth is left for the orchestrator to assign.
pub fn extract_children(page: &Page, body: &str) -> Vec<Page> {
    extract_links(body, &page.url)
        .into_iter()
        .map(|url| Page::child_of(page, url))
        .collect()
}

/// Resolves an href against the page URL
///
/// Returns None if the link should not be followed.
fn resolve_link(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if !is_relative(href) || !is_crawlable(href) {
        return None;
    }

    normalize(page_url, href)
}
