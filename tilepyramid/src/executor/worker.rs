//! Render worker loop.
//!
//! Each [`TileWorker`] repeatedly claims an item from the shared
//! [`WorkQueue`]. A shutdown signal ends the loop. A render task is skipped
//! when its file already exists, otherwise the tile bounds are projected and
//! handed to the [`RenderEngine`]. Every claimed item is acknowledged,
//! whatever the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::policy::FailurePolicy;
use super::queue::{QueueItem, WorkQueue};
use crate::config::{TileFormat, TileSize};
use crate::coord::{ProjectionTable, TileCoordinate};
use crate::layout::DiskLayout;
use crate::log::Logger;
use crate::render::{RenderEngine, RenderRequest};
use crate::tasks::RenderTask;
use crate::{log_debug, log_error};

/// Shared state handed to every worker of a pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<WorkQueue>,
    pub projection: Arc<ProjectionTable>,
    pub engine: Arc<dyn RenderEngine>,
    pub logger: Arc<dyn Logger>,
    pub tile_size: TileSize,
    pub format: TileFormat,
    pub policy: FailurePolicy,
    /// Cancelled to stop every worker at its next dequeue.
    pub abort: CancellationToken,
}

/// A tile that could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub tile: TileCoordinate,
    pub path: PathBuf,
    pub message: String,
}

/// What one worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub rendered: u64,
    pub skipped: u64,
    pub failures: Vec<RenderFailure>,
}

/// Encoded sizes, in bytes, of the blank tiles common renderers produce.
pub const EMPTY_TILE_SIZES: [u64; 3] = [103, 126, 222];

enum TileOutcome {
    Rendered { empty: bool },
    Skipped { empty: bool },
    Failed(String),
}

pub struct TileWorker {
    id: usize,
    ctx: WorkerContext,
}

impl TileWorker {
    pub fn new(id: usize, ctx: WorkerContext) -> Self {
        Self { id, ctx }
    }

    /// Runs until a shutdown signal is claimed or the abort token fires.
    pub async fn run(self) -> WorkerReport {
        let mut report = WorkerReport {
            worker_id: self.id,
            ..WorkerReport::default()
        };
        log_debug!(self.ctx.logger, "worker {} started", self.id);

        loop {
            let claim = tokio::select! {
                biased;

                _ = self.ctx.abort.cancelled() => {
                    log_debug!(self.ctx.logger, "worker {} aborted", self.id);
                    break;
                }

                claim = self.ctx.queue.get() => claim,
            };
            let Some(claim) = claim else {
                break;
            };

            let task = match claim.item() {
                QueueItem::Shutdown => {
                    self.ctx.queue.acknowledge(claim);
                    log_debug!(self.ctx.logger, "worker {} received shutdown", self.id);
                    break;
                }
                QueueItem::Render(task) => task.clone(),
            };

            let outcome = self.process(task.clone()).await;
            self.ctx.queue.acknowledge(claim);

            match outcome {
                TileOutcome::Rendered { empty } => {
                    report.rendered += 1;
                    self.log_tile(&task, false, empty);
                }
                TileOutcome::Skipped { empty } => {
                    report.skipped += 1;
                    self.log_tile(&task, true, empty);
                }
                TileOutcome::Failed(message) => {
                    log_error!(
                        self.ctx.logger,
                        "worker {} failed to render {}: {}",
                        self.id,
                        task,
                        message
                    );
                    report.failures.push(RenderFailure {
                        tile: task.tile(),
                        path: task.path().to_path_buf(),
                        message,
                    });
                    if self.ctx.policy.aborts_on_failure() {
                        self.ctx.abort.cancel();
                        break;
                    }
                }
            }
        }

        log_debug!(
            self.ctx.logger,
            "worker {} stopped: {} rendered, {} skipped, {} failed",
            self.id,
            report.rendered,
            report.skipped,
            report.failures.len()
        );
        report
    }

    /// One debug line per finished tile: `(label : z, x, y, exists, empty)`.
    fn log_tile(&self, task: &RenderTask, exists: bool, empty: bool) {
        let tile = task.tile();
        log_debug!(
            self.ctx.logger,
            "({} : {}, {}, {}, {}, {})",
            task.label(),
            tile.z,
            tile.x,
            tile.y,
            if exists { "exists" } else { "" },
            if empty { "empty" } else { "" }
        );
    }

    /// Renders one task on the blocking pool. Panics become failures.
    async fn process(&self, task: RenderTask) -> TileOutcome {
        let projection = Arc::clone(&self.ctx.projection);
        let engine = Arc::clone(&self.ctx.engine);
        let size = self.ctx.tile_size;
        let format = self.ctx.format;

        let result = tokio::task::spawn_blocking(move || {
            render_task(&task, &projection, engine.as_ref(), size, format)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => TileOutcome::Failed("render engine panicked".to_string()),
            Err(e) => TileOutcome::Failed(e.to_string()),
        }
    }
}

fn render_task(
    task: &RenderTask,
    projection: &ProjectionTable,
    engine: &dyn RenderEngine,
    size: TileSize,
    format: TileFormat,
) -> TileOutcome {
    if DiskLayout::exists(task.path()) {
        return TileOutcome::Skipped {
            empty: is_empty_tile(task.path()),
        };
    }

    let bbox = match projection.tile_bounds(&task.tile()) {
        Ok(bbox) => bbox,
        Err(e) => return TileOutcome::Failed(e.to_string()),
    };

    let request = RenderRequest {
        bbox,
        size,
        format,
        destination: task.path().to_path_buf(),
    };
    match engine.render_tile(&request) {
        Ok(()) => TileOutcome::Rendered {
            empty: is_empty_tile(task.path()),
        },
        Err(e) => TileOutcome::Failed(e.to_string()),
    }
}

/// True when the file at `path` has one of the [`EMPTY_TILE_SIZES`].
pub fn is_empty_tile(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| EMPTY_TILE_SIZES.contains(&meta.len()))
        .unwrap_or(false)
}
