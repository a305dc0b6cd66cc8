use crate::UrlError;
use url::Url;

/// Resolves a link found on a page into the URL the crawler stores
///
/// # Normalization Steps
///
/// 1. Parse the base URL; give up if it is malformed or has no host
/// 2. Remove the fragment (everything after #)
/// 3. Split off the query string, which is kept as-is
/// 4. Resolve the href against the base's scheme, host and port only
///    (the base path is never used)
/// 5. Collapse `.`, `..` and duplicate slashes
/// 6. Remove trailing slashes
///
/// # Arguments
///
/// * `base_url` - URL of the page the link was found on
/// * `href` - Raw `href` attribute value
///
/// # Returns
///
/// * `Some(String)` - Normalized absolute URL
/// * `None` - The base URL could not be parsed
///
/// # Examples
///
/// ```
/// use clamber::url::normalize;
///
/// assert_eq!(
///     normalize("http://example.edu", "test#frag").as_deref(),
///     Some("http://example.edu/test")
/// );
/// ```
pub fn normalize(base_url: &str, href: &str) -> Option<String> {
    let mut url = Url::parse(base_url).ok()?;
    url.host_str()?;

    let href = href.split('#').next().unwrap_or_default();
    let (path, query) = match href.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (href, None),
    };

    url.set_path(&normalize_path(path));
    url.set_query(query.filter(|q| !q.is_empty()));
    url.set_fragment(None);

    let normalized = url.to_string();
    if url.query().is_some() {
        Some(normalized)
    } else {
        Some(clean_url(&normalized).to_string())
    }
}

/// Trims trailing slashes so `http://a.com/x/` and `http://a.com/x` share a key
pub fn clean_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Validates a caller-supplied root URL
///
/// Root URLs are not normalized further; they are stored exactly as the caller
/// sent them, minus trailing slashes.
pub fn parse_start_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}
