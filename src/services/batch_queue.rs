//! In-memory retrying batch queue for bulk writes.
//!
//! Items are drained in fixed-size batches by a single background task. Within
//! a batch every insert runs as its own tokio task, so one failing item never
//! holds up its siblings. Failed items go back to the tail of the queue until
//! their retry budget is spent, after which they are logged and dropped.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::VecDeque, sync::Arc, time::Duration};

use crate::error::AppResult;

/// Capability to persist one payload
#[async_trait::async_trait]
pub trait Inserter<P>: Send + Sync {
    async fn insert(&self, payload: &P) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub batch_size: usize,
    /// Re-attempts allowed after the first failure
    pub max_retries: u32,
    /// Pause between batches while items remain
    pub batch_delay: Duration,
    /// Pause before the next batch when an insert task panicked
    pub retry_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            batch_delay: Duration::from_millis(100),
            retry_backoff: Duration::from_secs(5),
        }
    }
}

/// Whether a drain task currently owns the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainState {
    Idle,
    Draining,
}

/// Point-in-time view of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_length: usize,
    pub is_processing: bool,
    pub batch_size: usize,
}

struct QueueItem<P> {
    payload: Arc<P>,
    inserter: Arc<dyn Inserter<P>>,
    retries: u32,
    enqueued_at: DateTime<Utc>,
}

struct QueueInner<P> {
    items: VecDeque<QueueItem<P>>,
    state: DrainState,
}

/// Shared handle to a batch queue; clones refer to the same queue
pub struct BatchQueue<P> {
    inner: Arc<Mutex<QueueInner<P>>>,
    config: QueueConfig,
}

impl<P> Clone for BatchQueue<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config,
        }
    }
}

impl<P> std::fmt::Debug for BatchQueue<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchQueue")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

impl<P> BatchQueue<P> {
    pub fn status(&self) -> QueueStatus {
        let inner = self.inner.lock();
        QueueStatus {
            queue_length: inner.items.len(),
            is_processing: inner.state == DrainState::Draining,
            batch_size: self.config.batch_size,
        }
    }

    /// Drops every pending item. A running drain stops once it finds the queue empty.
    pub fn clear(&self) {
        let dropped = {
            let mut inner = self.inner.lock();
            let count = inner.items.len();
            inner.items.clear();
            count
        };
        tracing::info!(dropped, "Batch queue cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: Send + Sync + 'static> BatchQueue<P> {
    /// A zero batch size is raised to one.
    pub fn new(mut config: QueueConfig) -> Self {
        config.batch_size = config.batch_size.max(1);
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                items: VecDeque::new(),
                state: DrainState::Idle,
            })),
            config,
        }
    }

    /// Appends an item and starts draining if the queue is idle.
    ///
    /// Must be called from within a tokio runtime. Never waits on the insert.
    pub fn enqueue(&self, payload: P, inserter: Arc<dyn Inserter<P>>) {
        let start_drain = {
            let mut inner = self.inner.lock();
            inner.items.push_back(QueueItem {
                payload: Arc::new(payload),
                inserter,
                retries: 0,
                enqueued_at: Utc::now(),
            });
            // Idle -> Draining happens under the lock, before the task exists
            if inner.state == DrainState::Idle {
                inner.state = DrainState::Draining;
                true
            } else {
                false
            }
        };

        if start_drain {
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }
    }

    async fn drain(self) {
        tracing::debug!("Batch queue drain started");

        loop {
            let Some(batch) = self.next_batch() else {
                tracing::debug!("Batch queue drained");
                return;
            };

            let faulted = self.run_batch(batch).await;

            if !self.is_empty() {
                let pause = if faulted {
                    tracing::warn!(
                        backoff_ms = self.config.retry_backoff.as_millis() as u64,
                        "Batch faulted, backing off"
                    );
                    self.config.retry_backoff
                } else {
                    self.config.batch_delay
                };
                tokio::time::sleep(pause).await;
            }
        }
    }

    /// Takes the next batch, or returns to Idle when nothing is left
    fn next_batch(&self) -> Option<Vec<QueueItem<P>>> {
        let mut inner = self.inner.lock();
        if inner.items.is_empty() {
            inner.state = DrainState::Idle;
            return None;
        }
        let take = self.config.batch_size.min(inner.items.len());
        Some(inner.items.drain(..take).collect())
    }

    /// Runs every item of the batch concurrently and waits for all of them.
    /// Returns true when an insert task panicked.
    async fn run_batch(&self, batch: Vec<QueueItem<P>>) -> bool {
        tracing::debug!(batch_size = batch.len(), "Processing insert batch");

        let tasks: Vec<_> = batch
            .into_iter()
            .map(|item| {
                let payload = Arc::clone(&item.payload);
                let inserter = Arc::clone(&item.inserter);
                let task = tokio::spawn(async move { inserter.insert(&payload).await });
                (item, task)
            })
            .collect();

        let mut succeeded = 0usize;
        let mut faulted = false;

        for (item, task) in tasks {
            match task.await {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => self.retry_or_drop(item, e.to_string()),
                Err(e) => {
                    tracing::error!(error = %e, "Insert task join error");
                    faulted = true;
                    self.retry_or_drop(item, e.to_string());
                }
            }
        }

        tracing::debug!(succeeded, "Insert batch settled");
        faulted
    }

    fn retry_or_drop(&self, mut item: QueueItem<P>, error: String) {
        if item.retries < self.config.max_retries {
            item.retries += 1;
            tracing::warn!(
                error = %error,
                retry = item.retries,
                max_retries = self.config.max_retries,
                "Insert failed, requeueing"
            );
            self.inner.lock().items.push_back(item);
        } else {
            tracing::error!(
                error = %error,
                retries = item.retries,
                queued_ms = (Utc::now() - item.enqueued_at).num_milliseconds(),
                "Insert failed permanently, dropping item"
            );
        }
    }
}
