//! Work queue for distributing crawl hops across workers
//!
//! This module handles:
//! - The JSON wire format of a unit of crawl work
//! - A durable SQLite-backed queue with delayed visibility and long polling
//! - Consumer loops feeding received messages into a channel

mod message;
mod sqlite;

pub use message::{ParentMessage, QueueMessage};
pub use sqlite::SqliteQueue;

use crate::page::Page;
use crate::storage::pool::is_conflict_error;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Delay before a consumer retries after a failed receive
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// Another consumer held the queue lock; nothing was claimed
    #[error("Queue busy: {0}")]
    Conflict(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        if is_conflict_error(&err) {
            Self::Conflict(err.to_string())
        } else {
            Self::Sqlite(err)
        }
    }
}

impl QueueError {
    /// Returns true for transient lock contention
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Trait for work queue backends
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueues one page hop
    ///
    /// The message only becomes visible to consumers after the queue's
    /// publish delay.
    ///
    /// # Returns
    ///
    /// The backend's id for the message
    async fn publish(&self, page: &Page) -> QueueResult<i64>;

    /// Long-polls for up to `max` visible messages
    ///
    /// Returns as soon as at least one message was claimed, or an empty batch
    /// once `wait` elapsed. Claimed messages are deleted immediately.
    async fn receive(&self, max: usize, wait: Duration) -> QueueResult<Vec<QueueMessage>>;

    /// Number of messages still queued, visible or not
    async fn pending(&self) -> QueueResult<u64>;
}

/// Tuning for [`spawn_consumers`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// Number of independent receive loops
    pub consumers: usize,
    /// Largest batch claimed per receive, also the channel capacity
    pub max_receive: usize,
    /// Long-poll wait per receive
    pub wait: Duration,
}

/// Starts `settings.consumers` receive loops feeding one channel
///
/// Each loop stops once the returned receiver is dropped. Receive errors are
/// logged and retried after a short pause.
pub fn spawn_consumers(
    queue: Arc<dyn WorkQueue>,
    settings: ConsumerSettings,
) -> mpsc::Receiver<QueueMessage> {
    let capacity = settings.max_receive.max(1);
    let (tx, rx) = mpsc::channel(capacity);

    for consumer in 0..settings.consumers.max(1) {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();

        tokio::spawn(async move {
            tracing::debug!(consumer, "Queue consumer started");
            loop {
                if tx.is_closed() {
                    break;
                }

                match queue.receive(capacity, settings.wait).await {
                    Ok(messages) => {
                        if !messages.is_empty() {
                            tracing::info!(consumer, count = messages.len(), "Received messages");
                        }
                        for message in messages {
                            if tx.send(message).await.is_err() {
                                tracing::debug!(consumer, "Queue consumer stopped");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to receive messages on consumer {}: {}. Retrying...",
                            consumer,
                            e
                        );
                        tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                    }
                }
            }
            tracing::debug!(consumer, "Queue consumer stopped");
        });
    }

    rx
}
