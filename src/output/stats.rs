//! Statistics over the persisted link graph
//!
//! This module provides functionality for extracting and displaying
//! statistics from the graph store and the work queue.

use crate::queue::WorkQueue;
use crate::storage::{GraphStatistics, GraphStore, StoreResult};
use serde::Serialize;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStatistics {
    /// Node and edge counts of the graph
    pub graph: GraphStatistics,

    /// Messages still waiting in the work queue, if one is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_messages: Option<u64>,
}

impl CrawlStatistics {
    /// Pages whose fetch ended in a 2xx status
    pub fn successful_pages(&self) -> u64 {
        self.graph
            .nodes_by_status
            .range(200..300)
            .map(|(_, count)| count)
            .sum()
    }
}

/// Loads statistics from the store and, when given, the queue
///
/// # Arguments
///
/// * `store` - The graph store to query
/// * `queue` - The work queue, if crawls are dispatched through one
pub async fn load_statistics(
    store: &dyn GraphStore,
    queue: Option<&dyn WorkQueue>,
) -> StoreResult<CrawlStatistics> {
    let graph = store.statistics().await?;

    let pending_messages = match queue {
        Some(queue) => match queue.pending().await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!("Could not count queued messages: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(CrawlStatistics {
        graph,
        pending_messages,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages stored: {}", stats.graph.total_nodes);
    println!("  Links stored: {}", stats.graph.total_links);
    if let Some(pending) = stats.pending_messages {
        println!("  Queued hops: {}", pending);
    }
    println!();

    println!("Pages by Status:");
    // Sort statuses by count (descending)
    let mut status_counts: Vec<_> = stats.graph.nodes_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (status, count) in status_counts {
        let percentage = if stats.graph.total_nodes > 0 {
            (*count as f64 / stats.graph.total_nodes as f64) * 100.0
        } else {
            0.0
        };
        let label = if *status == 0 {
            "unfetched".to_string()
        } else {
            status.to_string()
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    let successful = stats.successful_pages();
    let success_rate = if stats.graph.total_nodes > 0 {
        (successful as f64 / stats.graph.total_nodes as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages answered 2xx)",
        success_rate, successful, stats.graph.total_nodes
    );
}
