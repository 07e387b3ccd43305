//! Bounded producer/consumer execution of render tasks.
//!
//! One producer feeds a [`WorkQueue`] of fixed capacity; a [`WorkerPool`] of
//! N [`TileWorker`]s drains it. The producer finishes by putting one
//! [`QueueItem::Shutdown`] per worker and calling [`WorkQueue::join`], which
//! resolves only when every task and every shutdown signal has been
//! acknowledged.
//!
//! ```text
//! producer ──put──► WorkQueue (cap 32) ──get──► worker 0 ──► RenderEngine
//!                                        ├────► worker 1 ──► RenderEngine
//!                                        └────► worker N ──► RenderEngine
//!            join ◄──────── acknowledge ─────────┘
//! ```

mod policy;
mod pool;
mod queue;
mod worker;

pub use policy::{FailurePolicy, UnknownPolicy};
pub use pool::{PoolReport, WorkerPool};
pub use queue::{Claimed, QueueError, QueueItem, QueueStats, WorkQueue, DEFAULT_QUEUE_CAPACITY};
pub use worker::{
    is_empty_tile, RenderFailure, TileWorker, WorkerContext, WorkerReport, EMPTY_TILE_SIZES,
};
