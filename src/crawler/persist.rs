//! Writing crawled pages into the graph store
//!
//! Many hops, in many processes, write the same nodes and edges at once. The
//! store resolves those races with conditional writes and reports the losers
//! as conflicts, which are retried here.

use crate::retry::{retry, RetryPolicy};
use crate::storage::{GraphStore, NodeRecord, NodeUid, StoreError, StoreResult};

/// Attempts allowed for one edge creation
pub const EDGE_ATTEMPTS: u32 = 10;

/// Finds or creates a node, retrying conflicts for as long as they occur
pub async fn find_or_create_node(store: &dyn GraphStore, node: &NodeRecord) -> StoreResult<NodeUid> {
    retry(RetryPolicy::unbounded(), StoreError::is_conflict, move || {
        store.find_or_create_node(node)
    })
    .await
}

/// Finds or creates an edge, giving up after [`EDGE_ATTEMPTS`] conflicts
pub async fn find_or_create_edge(
    store: &dyn GraphStore,
    parent: NodeUid,
    child: NodeUid,
) -> StoreResult<bool> {
    retry(RetryPolicy::bounded(EDGE_ATTEMPTS), StoreError::is_conflict, move || {
        store.find_or_create_edge(parent, child)
    })
    .await
}

/// Persists a page and, when it has one, its parent and the edge between them
///
/// Nodes are written before the edge that references them.
///
/// # Returns
///
/// The uid of the page's node
pub async fn create(
    store: &dyn GraphStore,
    page: &NodeRecord,
    parent: Option<&NodeRecord>,
) -> StoreResult<NodeUid> {
    let uid = find_or_create_node(store, page).await?;

    if let Some(parent) = parent {
        let parent_uid = find_or_create_node(store, parent).await?;
        if !find_or_create_edge(store, parent_uid, uid).await? {
            tracing::warn!(
                "Edge {} -> {} missing after creation ({} -> {})",
                parent_uid,
                uid,
                parent.url,
                page.url
            );
        }
    }

    Ok(uid)
}
