//! Database schema definitions
//!
//! The graph store and the work queue may share one database file, so each
//! keeps its own schema and both are idempotent.

/// SQL schema for the link graph
pub const GRAPH_SCHEMA_SQL: &str = r#"
-- One node per distinct normalized URL
CREATE TABLE IF NOT EXISTS nodes (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    timestamp INTEGER NOT NULL,
    status_code INTEGER NOT NULL
);

-- The "links" relation, parent -> child
CREATE TABLE IF NOT EXISTS links (
    parent_uid INTEGER NOT NULL REFERENCES nodes(uid),
    child_uid INTEGER NOT NULL REFERENCES nodes(uid),
    PRIMARY KEY (parent_uid, child_uid)
);

CREATE INDEX IF NOT EXISTS idx_links_child ON links(child_uid);
"#;

/// SQL schema for the durable work queue
pub const QUEUE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS queue_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    body TEXT NOT NULL,
    visible_at INTEGER NOT NULL,
    enqueued_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_visible ON queue_messages(visible_at);
"#;

/// Initializes the graph schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_graph_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(GRAPH_SCHEMA_SQL)?;
    Ok(())
}

/// Initializes the queue schema
pub fn initialize_queue_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(QUEUE_SCHEMA_SQL)?;
    Ok(())
}
