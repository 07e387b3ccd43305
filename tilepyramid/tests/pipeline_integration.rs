//! Integration tests for a full pyramid run.
//!
//! These tests drive [`PyramidOrchestrator`] end to end against a temporary
//! tile root, with counting fakes for the render engine and the exporter:
//! - tile tree layout and idempotent reruns
//! - metadata and archive export
//! - archive guard, user abort and both failure policies
//!
//! Run with: `cargo test --test pipeline_integration`

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use tilepyramid::config::{PyramidConfig, TileFormat, ZoomRange};
use tilepyramid::coord::{BoundingBox, ProjectionTable, TileCoordinate};
use tilepyramid::executor::FailurePolicy;
use tilepyramid::log::{LogLevel, MemoryLogger, NoOpLogger};
use tilepyramid::publisher::{
    read_metadata, ArchiveExporter, ArchiveSummary, ExportOptions, PublishError, PublishResult,
};
use tilepyramid::render::{RenderEngine, RenderError, RenderRequest};
use tilepyramid::{PipelineError, PyramidOrchestrator};

// ============================================================================
// Fakes
// ============================================================================

/// Writes a small file per tile and counts calls.
#[derive(Default)]
struct CountingEngine {
    calls: AtomicUsize,
    destinations: Mutex<Vec<PathBuf>>,
    /// Fails any tile whose destination contains this fragment.
    fail_on: Option<String>,
    /// Cancelled once `cancel_after` tiles have been rendered.
    cancel: Option<(CancellationToken, usize)>,
    /// Written by the first render, standing in for another process.
    occupy: Option<PathBuf>,
}

impl CountingEngine {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RenderEngine for CountingEngine {
    fn render_tile(&self, request: &RenderRequest) -> Result<(), RenderError> {
        let count = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((token, after)) = &self.cancel {
            if count >= *after {
                token.cancel();
            }
        }
        if let Some(path) = &self.occupy {
            if count == 1 {
                fs::write(path, b"other").unwrap();
            }
        }
        if let Some(fragment) = &self.fail_on {
            if request.destination.to_string_lossy().contains(fragment.as_str()) {
                return Err(RenderError::Encode(format!("refusing {}", fragment)));
            }
        }
        assert!(request.bbox.min_x < request.bbox.max_x);
        fs::write(&request.destination, b"tile").map_err(|source| RenderError::Io {
            path: request.destination.clone(),
            source,
        })?;
        self.destinations
            .lock()
            .unwrap()
            .push(request.destination.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Records pack calls and writes a dummy archive.
#[derive(Default)]
struct RecordingExporter {
    calls: AtomicUsize,
    last_options: Mutex<Option<ExportOptions>>,
}

impl ArchiveExporter for RecordingExporter {
    fn pack(
        &self,
        tile_root: &Path,
        archive: &Path,
        options: &ExportOptions,
    ) -> PublishResult<ArchiveSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if archive.exists() {
            return Err(PublishError::ArchiveExists(archive.to_path_buf()));
        }
        assert!(tile_root.join("metadata.json").is_file());
        *self.last_options.lock().unwrap() = Some(*options);
        fs::write(archive, b"archive").unwrap();
        Ok(ArchiveSummary {
            path: archive.to_path_buf(),
            size: 7,
            checksum: "0".repeat(64),
            tile_count: 0,
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct Harness {
    engine: Arc<CountingEngine>,
    exporter: Arc<RecordingExporter>,
    orchestrator: PyramidOrchestrator,
}

fn harness(engine: CountingEngine) -> Harness {
    let engine = Arc::new(engine);
    let exporter = Arc::new(RecordingExporter::default());
    let orchestrator =
        PyramidOrchestrator::new(engine.clone(), exporter.clone(), Arc::new(NoOpLogger));
    Harness {
        engine,
        exporter,
        orchestrator,
    }
}

fn config(root: &Path, min: u8, max: u8) -> PyramidConfig {
    PyramidConfig::new(root.join("tiles"), ZoomRange::new(min, max).unwrap()).with_workers(3)
}

fn count_files(dir: &Path, extension: &str) -> usize {
    let mut count = 0;
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            count += count_files(&path, extension);
        } else if path.extension().is_some_and(|e| e == extension) {
            count += 1;
        }
    }
    count
}

// ============================================================================
// Tile tree
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_world_run_writes_every_tile() {
    let temp = TempDir::new().unwrap();
    let h = harness(CountingEngine::default());
    let config = config(temp.path(), 1, 2);

    let report = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.tiles_enqueued, 20);
    assert_eq!(report.rendered, 20);
    assert_eq!(report.skipped, 0);
    assert!(report.is_complete());
    assert_eq!(h.engine.calls(), 20);
    assert_eq!(count_files(&config.tile_root, "png"), 20);
    for (z, x, y) in [(1, 0, 0), (1, 1, 1), (2, 3, 0), (2, 0, 3)] {
        assert!(config.tile_root.join(format!("{}/{}/{}.png", z, x, y)).is_file());
    }

    // No archive requested: no metadata, no export.
    assert!(report.metadata.is_none());
    assert!(!config.tile_root.join("metadata.json").exists());
    assert_eq!(h.exporter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_run_renders_nothing() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), 1, 3);

    let first = harness(CountingEngine::default());
    first
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.engine.calls(), 84);

    let second = harness(CountingEngine::default());
    let report = second
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.engine.calls(), 0);
    assert_eq!(report.rendered, 0);
    assert_eq!(report.skipped, 84);
}

#[tokio::test]
async fn test_bbox_inside_one_tile_renders_only_that_tile() {
    let temp = TempDir::new().unwrap();
    let tile = ProjectionTable::build(4, 256)
        .tile_bounds(&TileCoordinate::new(3, 1, 1))
        .unwrap();
    let inset_x = tile.width() * 0.1;
    let inset_y = tile.height() * 0.1;
    let bbox = BoundingBox::new(
        tile.min_x + inset_x,
        tile.min_y + inset_y,
        tile.max_x - inset_x,
        tile.max_y - inset_y,
    )
    .unwrap();

    let h = harness(CountingEngine::default());
    let config = config(temp.path(), 3, 3).with_bbox(bbox);
    let report = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.tiles_enqueued, 1);
    let destinations = h.engine.destinations.lock().unwrap().clone();
    assert_eq!(destinations, vec![config.tile_root.join("3/1/1.png")]);
}

// ============================================================================
// Metadata and archive
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_run_writes_metadata_and_exports() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("world.tar.gz");
    let h = harness(CountingEngine::default());
    let config = config(temp.path(), 1, 2)
        .with_archive(&archive)
        .with_label("world")
        .with_format(TileFormat::Webp)
        .with_compression(false);

    let report = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap();

    let metadata = read_metadata(&config.tile_root).unwrap();
    assert_eq!(metadata.minzoom, "1");
    assert_eq!(metadata.maxzoom, "2");
    assert_eq!(metadata.name, "world");
    assert_eq!(metadata.format, TileFormat::Webp);

    let raw = fs::read_to_string(config.tile_root.join("metadata.json")).unwrap();
    assert!(raw.contains("\"minzoom\": \"1\""));

    assert_eq!(h.exporter.calls.load(Ordering::SeqCst), 1);
    let options = h.exporter.last_options.lock().unwrap().unwrap();
    assert_eq!(options.format, TileFormat::Webp);
    assert!(!options.compression);
    assert_eq!(report.archive.unwrap().path, archive);
    assert_eq!(count_files(&config.tile_root, "webp"), 20);
}

#[tokio::test]
async fn test_existing_archive_is_refused_up_front() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("taken.tar.gz");
    fs::write(&archive, b"original").unwrap();

    let h = harness(CountingEngine::default());
    let config = config(temp.path(), 1, 2).with_archive(&archive);
    let err = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ArchiveExists(ref p) if p == &archive));
    assert_eq!(fs::read(&archive).unwrap(), b"original");
    assert_eq!(h.engine.calls(), 0);
    assert_eq!(h.exporter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_archive_created_during_render_is_refused_before_export() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("late.tar.gz");
    let h = harness(CountingEngine {
        occupy: Some(archive.clone()),
        ..CountingEngine::default()
    });
    let config = config(temp.path(), 1, 2).with_archive(&archive);

    let err = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ArchiveExists(ref p) if p == &archive));
    assert_eq!(h.engine.calls(), 20);
    assert_eq!(h.exporter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read(&archive).unwrap(), b"other");
    assert!(!config.tile_root.join("metadata.json").exists());
}

// ============================================================================
// Cancellation and failures
// ============================================================================

#[tokio::test]
async fn test_pre_cancelled_token_aborts_without_rendering() {
    let temp = TempDir::new().unwrap();
    let h = harness(CountingEngine::default());
    let token = CancellationToken::new();
    token.cancel();

    let err = h
        .orchestrator
        .run(&config(temp.path(), 1, 4), token)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UserAbort));
    assert_eq!(h.engine.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_during_run_aborts() {
    const CANCEL_AT: usize = 5;
    const WORKERS: usize = 3;
    let temp = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let h = harness(CountingEngine {
        cancel: Some((token.clone(), CANCEL_AT)),
        ..CountingEngine::default()
    });
    let config = config(temp.path(), 1, 6).with_workers(WORKERS);

    let result = tokio::time::timeout(
        Duration::from_secs(30),
        h.orchestrator.run(&config, token),
    )
    .await
    .expect("run should not hang after cancellation");
    assert!(matches!(result, Err(PipelineError::UserAbort)));

    // Workers may finish what they had claimed, but claim nothing new.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let calls = h.engine.calls();
    assert!(calls >= CANCEL_AT);
    assert!(calls <= CANCEL_AT + 2 * WORKERS, "{} renders after cancel", calls);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.engine.calls(), calls);

    // Enqueued tasks never exceed the claimed ones plus one queue's worth,
    // too few to finish zoom 1-3 (84 tiles) and open zoom 4.
    assert!(!config.tile_root.join("4").exists());
    assert_eq!(h.exporter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abort_all_fails_run_without_deadlock() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("out.tar");
    let h = harness(CountingEngine {
        fail_on: Some("/2/1/".to_string()),
        ..CountingEngine::default()
    });
    let config = config(temp.path(), 1, 4).with_archive(&archive);

    let result = tokio::time::timeout(
        Duration::from_secs(30),
        h.orchestrator.run(&config, CancellationToken::new()),
    )
    .await
    .expect("run should not deadlock on a render failure");

    let err = result.unwrap_err();
    let failure = err.first_failure().expect("render failure recorded");
    assert_eq!(failure.tile.z, 2);
    assert_eq!(failure.tile.x, 1);
    assert!(failure.message.contains("refusing"));
    assert!(!config.tile_root.join("metadata.json").exists());
    assert!(!archive.exists());
    assert_eq!(h.exporter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_continue_on_error_completes_and_reports() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("out.tar");
    let h = harness(CountingEngine {
        fail_on: Some("/2/0/".to_string()),
        ..CountingEngine::default()
    });
    let config = config(temp.path(), 1, 2)
        .with_archive(&archive)
        .with_failure_policy(FailurePolicy::ContinueOnError);

    let report = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 4);
    assert!(report.failures.iter().all(|f| f.tile.z == 2 && f.tile.x == 0));
    assert_eq!(report.rendered, 16);
    assert!(!report.is_complete());
    assert!(report.metadata.is_some());
    assert_eq!(h.exporter.calls.load(Ordering::SeqCst), 1);
    assert!(archive.is_file());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_work() {
    let temp = TempDir::new().unwrap();
    let h = harness(CountingEngine::default());
    let config = config(temp.path(), 1, 2).with_workers(0);

    let err = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
    assert!(!config.tile_root.exists());
}

#[tokio::test]
async fn test_tile_root_occupied_by_file() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), 1, 1);
    fs::write(&config.tile_root, b"not a dir").unwrap();

    let h = harness(CountingEngine::default());
    let err = h
        .orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::CreateDirectoryFailed { .. }));
}

#[tokio::test]
async fn test_progress_is_logged_through_injected_logger() {
    let temp = TempDir::new().unwrap();
    let logger = Arc::new(MemoryLogger::new());
    let orchestrator = PyramidOrchestrator::new(
        Arc::new(CountingEngine::default()),
        Arc::new(RecordingExporter::default()),
        logger.clone(),
    );

    let config = config(temp.path(), 1, 1).with_label("LBL");
    orchestrator
        .run(&config, CancellationToken::new())
        .await
        .unwrap();

    let info = logger.messages_at(LogLevel::Info);
    assert!(info.iter().any(|m| m == "zoom 1: 4 tiles"));
    assert!(logger.contains("4 rendered"));

    let mut tiles: Vec<_> = logger
        .messages_at(LogLevel::Debug)
        .into_iter()
        .filter(|m| m.starts_with("(LBL : "))
        .collect();
    tiles.sort();
    assert_eq!(
        tiles,
        vec![
            "(LBL : 1, 0, 0, , )",
            "(LBL : 1, 0, 1, , )",
            "(LBL : 1, 1, 0, , )",
            "(LBL : 1, 1, 1, , )",
        ]
    );
}
