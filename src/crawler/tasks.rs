//! Counted groups of detached tasks
//!
//! Persistence and background crawling run as detached tasks so traversal is
//! never blocked by them. A [`TaskGroup`] counts those tasks so a caller can
//! still wait for all of them to finish.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A set of spawned tasks that can be waited on as a whole
#[derive(Debug, Default)]
pub struct TaskGroup {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl TaskGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Spawns `task` on the runtime and counts it until it finishes
    pub fn spawn<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let completion = Completion(Arc::clone(self));
        tokio::spawn(async move {
            let _completion = completion;
            task.await;
        });
    }

    /// Number of tasks still running
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Waits until no task of the group is running
    ///
    /// Tasks spawned while waiting are waited for as well.
    pub async fn wait(&self) {
        loop {
            let notified = self.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Decrements the group count when a task ends, even by panic
struct Completion(Arc<TaskGroup>);

impl Drop for Completion {
    fn drop(&mut self) {
        if self.0.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}
