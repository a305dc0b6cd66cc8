//! Crawler module for page fetching and link following
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML parsing and link extraction
//! - Hop orchestration, in-process or through the work queue
//! - Persistence of crawled pages into the graph store

mod coordinator;
mod fetcher;
mod parser;
pub mod persist;
mod scope;
mod tasks;
mod worker;

pub use coordinator::{Crawl, Crawler, DepthSplit, Dispatch};
pub use fetcher::{build_http_client, fetch_url, is_html_content_type, user_agent_string, FetchResult, Fetcher};
pub use parser::{extract_children, extract_links};
pub use scope::{CrawlScope, ScopeRegistry};
pub use tasks::TaskGroup;
pub use worker::run_worker;
