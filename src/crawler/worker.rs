//! Queue worker: crawls the hops other processes publish

use crate::crawler::coordinator::Crawler;
use crate::queue::{spawn_consumers, ConsumerSettings, WorkQueue};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Consumes the work queue until its consumers stop
///
/// Every message becomes its own hop task. Finished tasks are reaped as new
/// messages arrive so the set does not grow without bound.
pub async fn run_worker(crawler: Crawler, queue: Arc<dyn WorkQueue>, settings: ConsumerSettings) {
    tracing::info!(
        consumers = settings.consumers,
        max_receive = settings.max_receive,
        "Worker started"
    );

    let mut messages = spawn_consumers(queue, settings);
    let mut hops = JoinSet::new();

    while let Some(message) = messages.recv().await {
        tracing::debug!("Crawling {} (depth {})", message.url, message.depth);

        let crawler = crawler.clone();
        hops.spawn(async move { crawler.handle_message(message).await });

        while let Some(finished) = hops.try_join_next() {
            if let Err(e) = finished {
                tracing::error!("Hop task failed: {}", e);
            }
        }
    }

    while let Some(finished) = hops.join_next().await {
        if let Err(e) = finished {
            tracing::error!("Hop task failed: {}", e);
        }
    }
    tracing::info!("Worker stopped");
}
