//! Configuration module for Clamber
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use clamber::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("clamber.toml")).unwrap();
//! println!("Fetches retry {} times", config.http.retry_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DispatchMode, HttpConfig, QueryConfig, QueueConfig, StoreConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, config_hash, load_config, load_config_with_hash, parse_config};
