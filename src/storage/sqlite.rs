//! SQLite graph store implementation
//!
//! This module provides a SQLite-based implementation of the GraphStore trait.

use crate::config::StoreConfig;
use crate::page::Depth;
use crate::storage::pool::ConnectionPool;
use crate::storage::schema::initialize_graph_schema;
use crate::storage::traits::{GraphStore, StoreError, StoreResult};
use crate::storage::{GraphNode, GraphStatistics, NodeRecord, NodeUid};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// SQLite graph store backend
#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteGraphStore {
    /// Opens (creating if needed) a graph store
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `busy_timeout` - How long a writer waits for the lock before the
    ///   transaction is reported as a conflict
    pub fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        let pool = ConnectionPool::open::<StoreError, _>(path, busy_timeout, initialize_graph_schema)?;
        Ok(Self { pool })
    }

    /// Opens the graph store described by the `[store]` config section
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::open(Path::new(&config.database_path), config.busy_timeout())
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn find_or_create_node(&self, node: &NodeRecord) -> StoreResult<NodeUid> {
        let node = node.clone();
        self.pool
            .run(move |conn| -> StoreResult<NodeUid> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let created = tx.execute(
                    "INSERT INTO nodes (url, timestamp, status_code) VALUES (?1, ?2, ?3)
                     ON CONFLICT(url) DO NOTHING",
                    params![node.url, node.timestamp, node.status_code],
                )?;
                let uid: i64 = tx.query_row(
                    "SELECT uid FROM nodes WHERE url = ?1",
                    params![node.url],
                    |row| row.get(0),
                )?;
                tx.commit()?;

                if created > 0 {
                    tracing::trace!(url = %node.url, uid = %NodeUid(uid), "Created node");
                }
                Ok(NodeUid(uid))
            })
            .await
    }

    async fn find_or_create_edge(&self, parent: NodeUid, child: NodeUid) -> StoreResult<bool> {
        self.pool
            .run(move |conn| -> StoreResult<bool> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO links (parent_uid, child_uid) VALUES (?1, ?2)
                     ON CONFLICT(parent_uid, child_uid) DO NOTHING",
                    params![parent.0, child.0],
                )?;
                let exists = edge_exists(&tx, parent, child)?;
                tx.commit()?;
                Ok(exists)
            })
            .await
    }

    async fn check_edge(&self, parent: NodeUid, child: NodeUid) -> StoreResult<bool> {
        self.pool
            .run(move |conn| -> StoreResult<bool> { Ok(edge_exists(conn, parent, child)?) })
            .await
    }

    async fn load_subgraph(&self, url: &str, depth: Depth) -> StoreResult<Option<GraphNode>> {
        let url = url.to_string();
        self.pool
            .run(move |conn| -> StoreResult<Option<GraphNode>> {
                // One read transaction gives a consistent snapshot of the walk.
                let tx = conn.transaction()?;
                let tree = load_tree(&tx, &url, depth)?;
                tx.commit()?;
                Ok(tree)
            })
            .await
    }

    async fn statistics(&self) -> StoreResult<GraphStatistics> {
        self.pool
            .run(|conn| -> StoreResult<GraphStatistics> {
                let total_nodes: i64 =
                    conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
                let total_links: i64 =
                    conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;

                let mut stmt = conn.prepare(
                    "SELECT status_code, COUNT(*) FROM nodes GROUP BY status_code ORDER BY status_code",
                )?;
                let nodes_by_status = stmt
                    .query_map([], |row| Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)? as u64)))?
                    .collect::<Result<_, _>>()?;

                Ok(GraphStatistics {
                    total_nodes: total_nodes as u64,
                    total_links: total_links as u64,
                    nodes_by_status,
                })
            })
            .await
    }
}

fn edge_exists(conn: &Connection, parent: NodeUid, child: NodeUid) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM links WHERE parent_uid = ?1 AND child_uid = ?2",
        params![parent.0, child.0],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// A node row before its links are attached
struct NodeRow {
    uid: NodeUid,
    url: String,
    timestamp: i64,
    status_code: u16,
}

impl NodeRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uid: NodeUid(row.get(0)?),
            url: row.get(1)?,
            timestamp: row.get(2)?,
            status_code: row.get(3)?,
        })
    }
}

/// Breadth-first walk from `url`, expanding every node at most once
fn load_tree(conn: &Connection, url: &str, depth: Depth) -> rusqlite::Result<Option<GraphNode>> {
    let root = conn
        .query_row(
            "SELECT uid, url, timestamp, status_code FROM nodes WHERE url = ?1",
            params![url],
            NodeRow::from_row,
        )
        .optional()?;

    let Some(root) = root else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT n.uid, n.url, n.timestamp, n.status_code
         FROM links l JOIN nodes n ON n.uid = l.child_uid
         WHERE l.parent_uid = ?1
         ORDER BY n.url",
    )?;

    let root_uid = root.uid;
    let mut rows: HashMap<NodeUid, NodeRow> = HashMap::new();
    let mut children: HashMap<NodeUid, Vec<NodeUid>> = HashMap::new();
    let mut seen: HashSet<NodeUid> = HashSet::from([root_uid]);
    let mut frontier = vec![root_uid];
    rows.insert(root_uid, root);

    let mut hops = 0usize;
    while !frontier.is_empty() && depth.allows_hop(hops) {
        let mut next = Vec::new();
        for parent in frontier {
            let linked = stmt
                .query_map(params![parent.0], NodeRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            for row in linked {
                if seen.insert(row.uid) {
                    children.entry(parent).or_default().push(row.uid);
                    next.push(row.uid);
                    rows.insert(row.uid, row);
                }
            }
        }
        frontier = next;
        hops += 1;
    }

    Ok(assemble(root_uid, &mut rows, &mut children))
}

fn assemble(
    uid: NodeUid,
    rows: &mut HashMap<NodeUid, NodeRow>,
    children: &mut HashMap<NodeUid, Vec<NodeUid>>,
) -> Option<GraphNode> {
    let row = rows.remove(&uid)?;
    let links = children
        .remove(&uid)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|child| assemble(child, rows, children))
        .collect();

    Some(GraphNode {
        uid: row.uid,
        url: row.url,
        timestamp: row.timestamp,
        status_code: row.status_code,
        links,
    })
}
