//! Output module for reporting on crawled data
//!
//! This module handles:
//! - Loading statistics from the graph store and work queue
//! - Rendering them for the command line

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
