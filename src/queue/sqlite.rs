//! SQLite work queue implementation

use crate::config::Config;
use crate::page::Page;
use crate::queue::{QueueError, QueueMessage, QueueResult, WorkQueue};
use crate::storage::{initialize_queue_schema, ConnectionPool};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Durable queue stored in the `queue_messages` table
#[derive(Debug, Clone)]
pub struct SqliteQueue {
    pool: Arc<ConnectionPool>,
    publish_delay: Duration,
    poll_interval: Duration,
}

impl SqliteQueue {
    /// Opens (creating if needed) a queue
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; may be the graph store's
    /// * `busy_timeout` - Lock wait before a claim is reported as contended
    /// * `publish_delay` - How long a new message stays invisible
    /// * `poll_interval` - How often `receive` checks for visible messages
    pub fn open(
        path: &Path,
        busy_timeout: Duration,
        publish_delay: Duration,
        poll_interval: Duration,
    ) -> QueueResult<Self> {
        let pool = ConnectionPool::open::<QueueError, _>(path, busy_timeout, initialize_queue_schema)?;
        Ok(Self {
            pool,
            publish_delay,
            poll_interval,
        })
    }

    /// Opens the queue described by the `[queue]` config section
    pub fn from_config(config: &Config) -> QueueResult<Self> {
        Self::open(
            Path::new(config.queue_database_path()),
            config.store.busy_timeout(),
            config.queue.publish_delay(),
            config.queue.poll_interval(),
        )
    }

    /// Claims and deletes up to `max` visible messages in one transaction
    async fn claim(&self, max: usize) -> QueueResult<Vec<String>> {
        let limit = i64::try_from(max).unwrap_or(i64::MAX);
        self.pool
            .run(move |conn| -> QueueResult<Vec<String>> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let claimed = {
                    let mut select = tx.prepare(
                        "SELECT id, body FROM queue_messages
                         WHERE visible_at <= ?1
                         ORDER BY visible_at, id
                         LIMIT ?2",
                    )?;
                    let rows = select
                        .query_map(params![Utc::now().timestamp_millis(), limit], |row| {
                            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;

                    let mut delete = tx.prepare("DELETE FROM queue_messages WHERE id = ?1")?;
                    for (id, _) in &rows {
                        delete.execute(params![id])?;
                    }
                    rows
                };
                tx.commit()?;

                Ok(claimed.into_iter().map(|(_, body)| body).collect())
            })
            .await
    }
}

#[async_trait]
impl WorkQueue for SqliteQueue {
    async fn publish(&self, page: &Page) -> QueueResult<i64> {
        let body = serde_json::to_string(&QueueMessage::from(page))?;
        let delay_ms = i64::try_from(self.publish_delay.as_millis()).unwrap_or(i64::MAX);
        let url = page.url.clone();

        let id = self
            .pool
            .run(move |conn| -> QueueResult<i64> {
                let now = Utc::now().timestamp_millis();
                conn.execute(
                    "INSERT INTO queue_messages (body, visible_at, enqueued_at) VALUES (?1, ?2, ?3)",
                    params![body, now.saturating_add(delay_ms), now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        tracing::info!(url = %url, message_id = id, "Sent message");
        Ok(id)
    }

    async fn receive(&self, max: usize, wait: Duration) -> QueueResult<Vec<QueueMessage>> {
        let deadline = Instant::now() + wait;

        loop {
            let bodies = match self.claim(max.max(1)).await {
                Ok(bodies) => bodies,
                Err(e) if e.is_conflict() => Vec::new(),
                Err(e) => return Err(e),
            };

            if !bodies.is_empty() {
                let messages = bodies
                    .iter()
                    .filter_map(|body| match serde_json::from_str::<QueueMessage>(body) {
                        Ok(message) => Some(message),
                        Err(e) => {
                            tracing::warn!("Dropping undecodable queue message: {}", e);
                            None
                        }
                    })
                    .collect();
                return Ok(messages);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn pending(&self) -> QueueResult<u64> {
        self.pool
            .run(|conn| -> QueueResult<u64> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM queue_messages", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
    }
}
