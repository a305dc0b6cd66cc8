//! Clamber: a distributed link-graph crawler
//!
//! This crate crawls the web from a root URL down to a requested depth, persists
//! the discovered pages and their "links" relation in a transactional graph
//! store, and answers subgraph queries against what has been persisted.
//! Crawl work can run in-process or be distributed through a durable work queue.

pub mod config;
pub mod crawler;
pub mod output;
pub mod page;
pub mod query;
pub mod queue;
pub mod retry;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Clamber operations
#[derive(Debug, Error)]
pub enum ClamberError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] query::ResolveError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Clamber operations
pub type Result<T> = std::result::Result<T, ClamberError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, DepthSplit, Dispatch};
pub use page::{Depth, Page};
pub use query::{Query, Resolution, Resolver};
pub use url::{is_crawlable, is_relative, normalize};
