//! Storage traits and error types
//!
//! This module defines the trait interface for graph store backends and
//! associated error types.

use crate::page::Depth;
use crate::storage::pool::is_conflict_error;
use crate::storage::{GraphNode, GraphStatistics, NodeRecord, NodeUid};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during graph store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another transaction touched the same rows; the work may be retried
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The stored subgraph is shallower than requested
    #[error("Stored graph reaches depth {reached}, requested {requested}")]
    DepthMismatch {
        requested: Depth,
        reached: usize,
        partial: Box<GraphNode>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if is_conflict_error(&err) {
            Self::Conflict(err.to_string())
        } else {
            Self::Sqlite(err)
        }
    }
}

impl StoreError {
    /// Returns true for the transient "transaction aborted" class
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true when the error only means the graph is not deep enough yet
    pub fn is_depth_mismatch(&self) -> bool {
        matches!(self, Self::DepthMismatch { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for graph store backends
///
/// Every call runs in its own transaction. Writes are conditional so that any
/// number of processes may create the same node or edge concurrently; the
/// losers of a race either see the winner's row or fail with
/// [`StoreError::Conflict`] and retry.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Finds the node for `node.url`, creating it if absent
    ///
    /// # Arguments
    ///
    /// * `node` - URL, timestamp and status code of the page
    ///
    /// # Returns
    ///
    /// The uid of the one node stored for that URL
    async fn find_or_create_node(&self, node: &NodeRecord) -> StoreResult<NodeUid>;

    /// Creates the `parent -> child` edge if absent
    ///
    /// Returns whether the edge exists once the transaction committed.
    async fn find_or_create_edge(&self, parent: NodeUid, child: NodeUid) -> StoreResult<bool>;

    /// Checks whether the `parent -> child` edge exists
    async fn check_edge(&self, parent: NodeUid, child: NodeUid) -> StoreResult<bool>;

    /// Loads the node for `url` and up to `depth` hops of links below it
    ///
    /// No node is expanded twice, so cycles terminate. Children are ordered by
    /// URL. Returns `Ok(None)` if the URL was never persisted.
    async fn load_subgraph(&self, url: &str, depth: Depth) -> StoreResult<Option<GraphNode>>;

    /// Counts nodes and edges
    async fn statistics(&self) -> StoreResult<GraphStatistics>;

    /// Loads a subgraph and checks it reaches the requested depth
    ///
    /// # Returns
    ///
    /// * `Ok(Some(node))` - The stored tree is at least `depth` deep
    /// * `Ok(None)` - The URL was never persisted
    /// * `Err(StoreError::DepthMismatch)` - The tree is shallower than `depth`;
    ///   the partial tree is attached
    async fn find_subgraph(&self, url: &str, depth: Depth) -> StoreResult<Option<GraphNode>> {
        let Some(node) = self.load_subgraph(url, depth).await? else {
            return Ok(None);
        };

        let reached = node.max_depth();
        if !depth.is_reached_by(reached) {
            return Err(StoreError::DepthMismatch {
                requested: depth,
                reached,
                partial: Box::new(node),
            });
        }

        Ok(Some(node))
    }
}
