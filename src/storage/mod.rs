//! Storage module for the persisted link graph
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Idempotent node and edge creation under concurrent writers
//! - Bounded-depth subgraph queries
//! - The connection pool the work queue shares

pub mod pool;
mod schema;
mod sqlite;
mod traits;

pub use pool::ConnectionPool;
pub use schema::{initialize_graph_schema, initialize_queue_schema};
pub use sqlite::SqliteGraphStore;
pub use traits::{GraphStore, StoreError, StoreResult};

use crate::page::{Page, ParentLink};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Store-assigned identifier of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeUid(pub i64);

impl fmt::Display for NodeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// The fields written when a node is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub url: String,
    pub timestamp: i64,
    pub status_code: u16,
}

impl From<&Page> for NodeRecord {
    fn from(page: &Page) -> Self {
        Self {
            url: page.url.clone(),
            timestamp: page.timestamp,
            status_code: page.status_code,
        }
    }
}

impl From<&ParentLink> for NodeRecord {
    fn from(parent: &ParentLink) -> Self {
        Self {
            url: parent.url.clone(),
            timestamp: parent.timestamp,
            status_code: parent.status_code,
        }
    }
}

/// A persisted page and the part of its link graph loaded with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub uid: NodeUid,
    pub url: String,
    pub timestamp: i64,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<GraphNode>,
}

impl GraphNode {
    /// Number of hops from this node to its deepest loaded descendant
    pub fn max_depth(&self) -> usize {
        self.links
            .iter()
            .map(|child| child.max_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in the loaded tree, this one included
    pub fn node_count(&self) -> usize {
        1 + self.links.iter().map(GraphNode::node_count).sum::<usize>()
    }
}

impl From<GraphNode> for Page {
    fn from(node: GraphNode) -> Self {
        fn convert(node: GraphNode, start_url: &str) -> Page {
            Page {
                url: node.url,
                parent: None,
                depth: Default::default(),
                start_url: start_url.to_string(),
                timestamp: node.timestamp,
                status_code: node.status_code,
                children: node
                    .links
                    .into_iter()
                    .map(|child| convert(child, start_url))
                    .collect(),
            }
        }

        let start_url = node.url.clone();
        convert(node, &start_url)
    }
}

/// Aggregate counts over the whole graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStatistics {
    pub total_nodes: u64,
    pub total_links: u64,
    pub nodes_by_status: BTreeMap<u16, u64>,
}
