//! End-to-end pyramid run.
//!
//! [`PyramidOrchestrator`] wires the pieces together for one run:
//!
//! 1. Validate the config and refuse an existing archive path.
//! 2. Create the tile root and start the worker pool.
//! 3. For each zoom, create `<z>` then each `<z>/<x>` and enqueue the
//!    column's tiles.
//! 4. Enqueue one shutdown signal per worker and join the queue.
//! 5. Wait for the workers, then optionally write `metadata.json` and pack
//!    the archive.
//!
//! The render engine, exporter and logger are injected, so tests substitute
//! fakes for all three.

mod error;

pub use error::PipelineError;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::{PyramidConfig, ZoomRange};
use crate::coord::ProjectionTable;
use crate::executor::{
    FailurePolicy, QueueItem, RenderFailure, WorkQueue, WorkerContext, WorkerPool,
};
use crate::layout::DiskLayout;
use crate::log::Logger;
use crate::publisher::{self, ArchiveExporter, ArchiveSummary, ExportOptions, TileMetadata};
use crate::render::RenderEngine;
use crate::tasks::{RenderTask, TileEnumerator};
use crate::{log_debug, log_info, log_warn};

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidReport {
    pub zoom: ZoomRange,
    pub tiles_enqueued: u64,
    pub rendered: u64,
    pub skipped: u64,
    /// Non-empty only under [`FailurePolicy::ContinueOnError`].
    pub failures: Vec<RenderFailure>,
    pub metadata: Option<PathBuf>,
    pub archive: Option<ArchiveSummary>,
    pub elapsed: Duration,
}

impl PyramidReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a pyramid build against injected collaborators.
pub struct PyramidOrchestrator {
    engine: Arc<dyn RenderEngine>,
    exporter: Arc<dyn ArchiveExporter>,
    logger: Arc<dyn Logger>,
}

impl PyramidOrchestrator {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        exporter: Arc<dyn ArchiveExporter>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            engine,
            exporter,
            logger,
        }
    }

    /// Builds the pyramid described by `config`.
    ///
    /// Cancelling `shutdown` makes the run return [`PipelineError::UserAbort`]
    /// at its next suspension point. Workers are told to stop but are not
    /// awaited, and partial output is left in place.
    pub async fn run(
        &self,
        config: &PyramidConfig,
        shutdown: CancellationToken,
    ) -> Result<PyramidReport, PipelineError> {
        let started = Instant::now();
        config.validate()?;
        if shutdown.is_cancelled() {
            return Err(PipelineError::UserAbort);
        }
        if let Some(archive) = &config.archive {
            ensure_archive_absent(archive)?;
        }

        let layout = DiskLayout::new(&config.tile_root, config.format);
        ensure_dir(layout.root())?;

        let projection = Arc::new(ProjectionTable::build(
            config.zoom.max() + 1,
            config.tile_size.pixels(),
        ));
        let queue = Arc::new(WorkQueue::new(config.queue_capacity));
        let abort = shutdown.child_token();
        let pool = WorkerPool::spawn(
            config.workers,
            WorkerContext {
                queue: Arc::clone(&queue),
                projection: Arc::clone(&projection),
                engine: Arc::clone(&self.engine),
                logger: Arc::clone(&self.logger),
                tile_size: config.tile_size,
                format: config.format,
                policy: config.failure_policy,
                abort: abort.clone(),
            },
        );

        log_info!(
            self.logger,
            "rendering zoom {} with {} workers ({}) into {}",
            config.zoom,
            config.workers,
            self.engine.name(),
            layout.root().display()
        );

        let produced = self
            .produce(config, &layout, &projection, &queue, &abort)
            .await;
        let tiles_enqueued = match produced {
            Ok(count) => count,
            Err(e) => {
                abort.cancel();
                return Err(e);
            }
        };

        if shutdown.is_cancelled() {
            log_warn!(self.logger, "run aborted by user");
            return Err(PipelineError::UserAbort);
        }

        let pool_report = pool.wait().await;
        if pool_report.crashed > 0 {
            log_warn!(self.logger, "{} render worker(s) crashed", pool_report.crashed);
        }

        let rendered = pool_report.rendered();
        let skipped = pool_report.skipped();
        let failures = pool_report.into_failures();

        if config.failure_policy == FailurePolicy::AbortAll && !failures.is_empty() {
            return Err(PipelineError::RenderFailed { failures });
        }
        let Some(tiles_enqueued) = tiles_enqueued else {
            // Only a render failure cancels the child token without the parent.
            return Err(PipelineError::RenderFailed { failures });
        };
        log_info!(
            self.logger,
            "{} tiles enqueued: {} rendered, {} skipped, {} failed",
            tiles_enqueued,
            rendered,
            skipped,
            failures.len()
        );

        let (metadata, archive) = match &config.archive {
            Some(archive) => {
                let (metadata, summary) = self.export(config, &layout, archive).await?;
                (Some(metadata), Some(summary))
            }
            None => (None, None),
        };

        Ok(PyramidReport {
            zoom: config.zoom,
            tiles_enqueued,
            rendered,
            skipped,
            failures,
            metadata,
            archive,
            elapsed: started.elapsed(),
        })
    }

    /// Enqueues every task plus the shutdown signals, then joins the queue.
    ///
    /// Returns `Ok(None)` if the abort token fired first.
    async fn produce(
        &self,
        config: &PyramidConfig,
        layout: &DiskLayout,
        projection: &ProjectionTable,
        queue: &WorkQueue,
        abort: &CancellationToken,
    ) -> Result<Option<u64>, PipelineError> {
        let label: Arc<str> = Arc::from(config.label.as_str());
        let enumerator = TileEnumerator::new(config.bbox, projection);
        let mut enqueued = 0u64;

        for z in config.zoom.levels() {
            ensure_dir(&layout.zoom_dir(z))?;
            let tiles = enumerator.zoom(z)?;
            log_info!(self.logger, "zoom {}: {} tiles", z, tiles.len());

            let mut column = None;
            for tile in tiles {
                if column != Some(tile.x) {
                    ensure_dir(&layout.column_dir(z, tile.x))?;
                    column = Some(tile.x);
                }
                let task = RenderTask::new(Arc::clone(&label), layout.tile_path(&tile), tile);
                if !submit(queue, QueueItem::Render(task), abort).await? {
                    return Ok(None);
                }
                enqueued += 1;
            }
        }

        for _ in 0..config.workers {
            if !submit(queue, QueueItem::Shutdown, abort).await? {
                return Ok(None);
            }
        }
        log_debug!(self.logger, "all tasks enqueued, waiting for workers");

        tokio::select! {
            biased;

            _ = abort.cancelled() => Ok(None),
            stats = queue.join() => {
                let stats = stats?;
                log_debug!(
                    self.logger,
                    "queue drained: {} tasks, {} shutdowns acknowledged",
                    stats.tasks_acknowledged,
                    stats.shutdowns_acknowledged
                );
                Ok(Some(enqueued))
            }
        }
    }

    async fn export(
        &self,
        config: &PyramidConfig,
        layout: &DiskLayout,
        archive: &Path,
    ) -> Result<(PathBuf, ArchiveSummary), PipelineError> {
        ensure_archive_absent(archive)?;

        let metadata = TileMetadata::new(
            config.label.clone(),
            config.format,
            config.scheme,
            config.zoom,
            &config.bbox,
        );
        let metadata_path = publisher::write_metadata(layout.root(), &metadata)?;
        log_debug!(self.logger, "wrote {}", metadata_path.display());

        let options = ExportOptions {
            format: config.format,
            scheme: config.scheme,
            compression: config.compression,
        };
        let exporter = Arc::clone(&self.exporter);
        let tile_root = layout.root().to_path_buf();
        let archive_path = archive.to_path_buf();
        log_info!(
            self.logger,
            "packing {} with {}",
            archive_path.display(),
            exporter.name()
        );

        let summary = tokio::task::spawn_blocking(move || {
            exporter.pack(&tile_root, &archive_path, &options)
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;

        log_info!(
            self.logger,
            "archive {} written ({} bytes, sha256 {})",
            summary.path.display(),
            summary.size,
            summary.checksum
        );
        Ok((metadata_path, summary))
    }
}

/// Puts one item, racing the abort token. `Ok(false)` means aborted.
async fn submit(
    queue: &WorkQueue,
    item: QueueItem,
    abort: &CancellationToken,
) -> Result<bool, PipelineError> {
    tokio::select! {
        biased;

        _ = abort.cancelled() => Ok(false),
        result = queue.put(item) => {
            result?;
            Ok(true)
        }
    }
}

fn ensure_dir(path: &Path) -> Result<(), PipelineError> {
    DiskLayout::ensure_dir(path).map_err(|source| PipelineError::CreateDirectoryFailed {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_archive_absent(archive: &Path) -> Result<(), PipelineError> {
    if archive.exists() {
        return Err(PipelineError::ArchiveExists(archive.to_path_buf()));
    }
    Ok(())
}
