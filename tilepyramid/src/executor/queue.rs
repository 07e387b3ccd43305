//! Bounded work queue with acknowledgement tracking.
//!
//! The queue carries render tasks plus one shutdown signal per worker.
//! Every item retrieved with [`WorkQueue::get`] must be handed back to
//! [`WorkQueue::acknowledge`]; [`WorkQueue::join`] resolves once every item
//! that was put has been acknowledged.
//!
//! # Example
//!
//! ```ignore
//! let queue = Arc::new(WorkQueue::new(DEFAULT_QUEUE_CAPACITY));
//!
//! queue.put(QueueItem::Render(task)).await?;
//! queue.put(QueueItem::Shutdown).await?;
//!
//! // in a worker
//! while let Some(claim) = queue.get().await {
//!     let done = claim.is_shutdown();
//!     queue.acknowledge(claim);
//!     if done { break; }
//! }
//!
//! queue.join().await?;
//! ```

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};

use crate::tasks::RenderTask;

/// Maximum number of queued, unclaimed items.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

// =============================================================================
// Queue Items
// =============================================================================

/// An entry on the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Render(RenderTask),
    /// Tells exactly one worker to stop.
    Shutdown,
}

impl QueueItem {
    fn is_shutdown(&self) -> bool {
        matches!(self, QueueItem::Shutdown)
    }
}

/// An item taken off the queue and not yet acknowledged.
///
/// Acknowledging consumes the claim, so an item cannot be acknowledged twice.
#[derive(Debug)]
#[must_use = "claimed items must be acknowledged or join() never resolves"]
pub struct Claimed {
    item: QueueItem,
}

impl Claimed {
    pub fn item(&self) -> &QueueItem {
        &self.item
    }

    pub fn is_shutdown(&self) -> bool {
        self.item.is_shutdown()
    }
}

// =============================================================================
// Queue Statistics
// =============================================================================

/// Put and acknowledgement counts, split by item kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub tasks_put: u64,
    pub shutdowns_put: u64,
    pub tasks_acknowledged: u64,
    pub shutdowns_acknowledged: u64,
}

impl QueueStats {
    /// Items put but not yet acknowledged.
    pub fn outstanding(&self) -> u64 {
        (self.tasks_put + self.shutdowns_put)
            .saturating_sub(self.tasks_acknowledged + self.shutdowns_acknowledged)
    }

    /// True once every put item of both kinds has been acknowledged.
    pub fn is_drained(&self) -> bool {
        self.tasks_acknowledged == self.tasks_put
            && self.shutdowns_acknowledged == self.shutdowns_put
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("work queue is closed")]
    Closed,
}

// =============================================================================
// Work Queue
// =============================================================================

/// Bounded FIFO shared by one producer and many workers.
///
/// Share it behind an `Arc`. The receiver sits behind a mutex so each item
/// is delivered to exactly one caller of [`get`](Self::get).
#[derive(Debug)]
pub struct WorkQueue {
    sender: mpsc::Sender<QueueItem>,
    receiver: Mutex<mpsc::Receiver<QueueItem>>,
    stats: watch::Sender<QueueStats>,
    capacity: usize,
}

impl WorkQueue {
    /// Creates a queue holding at most `capacity` unclaimed items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. `PyramidConfig::validate` rejects that
    /// before a queue is built.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let (stats, _) = watch::channel(QueueStats::default());
        Self {
            sender,
            receiver: Mutex::new(receiver),
            stats,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items waiting to be claimed.
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        *self.stats.borrow()
    }

    /// Enqueues an item, waiting while the queue is full.
    ///
    /// Cancel safe: if the future is dropped before it resolves, the item was
    /// neither enqueued nor counted.
    pub async fn put(&self, item: QueueItem) -> Result<(), QueueError> {
        let permit = self.sender.reserve().await.map_err(|_| QueueError::Closed)?;
        // Counted before the send so a fast worker can never acknowledge an
        // item that is not yet recorded as put.
        let shutdown = item.is_shutdown();
        self.stats.send_modify(|stats| {
            if shutdown {
                stats.shutdowns_put += 1;
            } else {
                stats.tasks_put += 1;
            }
        });
        permit.send(item);
        Ok(())
    }

    /// Claims the next item, waiting while the queue is empty.
    ///
    /// Cancel safe. Returns `None` only if the queue has been torn down.
    pub async fn get(&self) -> Option<Claimed> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await.map(|item| Claimed { item })
    }

    /// Marks a claimed item as processed.
    pub fn acknowledge(&self, claim: Claimed) {
        let shutdown = claim.is_shutdown();
        self.stats.send_modify(|stats| {
            if shutdown {
                stats.shutdowns_acknowledged += 1;
            } else {
                stats.tasks_acknowledged += 1;
            }
        });
    }

    /// Waits until every put item has been acknowledged.
    pub async fn join(&self) -> Result<QueueStats, QueueError> {
        let mut watcher = self.stats.subscribe();
        let stats = watcher
            .wait_for(QueueStats::is_drained)
            .await
            .map_err(|_| QueueError::Closed)?;
        Ok(*stats)
    }
}
