//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a fixed backoff between attempts
//! - Error classification

use crate::config::{HttpConfig, UserAgentConfig};
use reqwest::Client;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page (2xx)
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// The server answered with a status that retrying will not change
    Terminal {
        /// The HTTP status code
        status_code: u16,
    },

    /// Every attempt got a 5xx answer
    Exhausted {
        /// Status code of the last attempt
        status_code: u16,
        /// Number of attempts made
        attempts: u32,
    },

    /// Network error (connection refused, timeout, body read, etc.)
    Transport {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// HTTP status code of the last response, if there was one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Success { status_code, .. }
            | Self::Terminal { status_code }
            | Self::Exhausted { status_code, .. } => Some(*status_code),
            Self::Transport { .. } => None,
        }
    }

    /// Returns true for a successful response with an HTML body
    pub fn is_html(&self) -> bool {
        match self {
            Self::Success { content_type, .. } => is_html_content_type(content_type),
            _ => false,
        }
    }
}

/// Returns true if a Content-Type header names an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type.trim_start().starts_with("text/html")
}

/// Formats the identifying user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use clamber::config::UserAgentConfig;
/// use clamber::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Clamber".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, retrying server errors
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Success |
/// | HTTP 5xx | Retry after `backoff`, up to `max_attempts` in total |
/// | Any other status | Immediate → Terminal |
/// | Connection, timeout or body error | Immediate → Transport |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `max_attempts` - Total attempts, the first included
/// * `backoff` - Pause between attempts
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_url(client: &Client, url: &str, max_attempts: u32, backoff: Duration) -> FetchResult {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = describe_transport_error(&e);
                tracing::warn!("HTTP failure fetching {}: {}", url, error);
                return FetchResult::Transport { error };
            }
        };

        let status = response.status();

        if status.is_success() {
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            return match response.text().await {
                Ok(body) => FetchResult::Success {
                    final_url,
                    status_code: status.as_u16(),
                    content_type,
                    body,
                },
                Err(e) => {
                    tracing::warn!("Failed to read body of {}: {}", url, e);
                    FetchResult::Transport {
                        error: e.to_string(),
                    }
                }
            };
        }

        if status.is_server_error() {
            if attempt >= max_attempts {
                tracing::warn!(
                    "Giving up on {} after {} attempts (HTTP {})",
                    url,
                    attempt,
                    status.as_u16()
                );
                return FetchResult::Exhausted {
                    status_code: status.as_u16(),
                    attempts: attempt,
                };
            }

            tracing::debug!(
                "HTTP {} from {}, retrying in {:?} (attempt {}/{})",
                status.as_u16(),
                url,
                backoff,
                attempt,
                max_attempts
            );
            tokio::time::sleep(backoff).await;
            continue;
        }

        tracing::debug!("HTTP {} from {}, not retrying", status.as_u16(), url);
        return FetchResult::Terminal {
            status_code: status.as_u16(),
        };
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// HTTP client bundled with its retry settings
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    backoff: Duration,
}

impl Fetcher {
    pub fn new(client: Client, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Builds a fetcher from the `[http]` and `[user-agent]` config sections
    pub fn from_config(http: &HttpConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, http.timeout())?;
        Ok(Self::new(client, http.max_attempts(), http.back_off()))
    }

    /// Fetches `url` with this fetcher's retry settings
    pub async fn fetch(&self, url: &str) -> FetchResult {
        fetch_url(&self.client, url, self.max_attempts, self.backoff).await
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
