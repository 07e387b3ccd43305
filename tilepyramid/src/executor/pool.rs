//! Fixed-size pool of render workers.

use futures::future::join_all;
use tokio::task::JoinHandle;

use super::worker::{RenderFailure, TileWorker, WorkerContext, WorkerReport};
use crate::log_error;

/// Handles to a set of running [`TileWorker`]s.
///
/// Dropping the pool detaches the workers. They still stop once the abort
/// token of their context is cancelled.
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
    ctx: WorkerContext,
}

impl WorkerPool {
    /// Spawns `count` workers onto the current runtime.
    pub fn spawn(count: usize, ctx: WorkerContext) -> Self {
        let handles = (0..count)
            .map(|id| tokio::spawn(TileWorker::new(id, ctx.clone()).run()))
            .collect();
        Self { handles, ctx }
    }

    /// Waits for every worker to stop and collects their reports.
    pub async fn wait(self) -> PoolReport {
        let mut report = PoolReport::default();
        for result in join_all(self.handles).await {
            match result {
                Ok(worker) => report.workers.push(worker),
                Err(e) => {
                    log_error!(self.ctx.logger, "render worker crashed: {}", e);
                    report.crashed += 1;
                }
            }
        }
        report
    }
}

/// Combined outcome of all workers in a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub workers: Vec<WorkerReport>,
    /// Workers whose task ended without returning a report.
    pub crashed: usize,
}

impl PoolReport {
    pub fn rendered(&self) -> u64 {
        self.workers.iter().map(|w| w.rendered).sum()
    }

    pub fn skipped(&self) -> u64 {
        self.workers.iter().map(|w| w.skipped).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RenderFailure> {
        self.workers.iter().flat_map(|w| w.failures.iter())
    }

    pub fn failure_count(&self) -> usize {
        self.workers.iter().map(|w| w.failures.len()).sum()
    }

    pub fn into_failures(self) -> Vec<RenderFailure> {
        self.workers.into_iter().flat_map(|w| w.failures).collect()
    }
}
