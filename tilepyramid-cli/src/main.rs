//! tilepyramid CLI
//!
//! Renders the tile pyramid for a bounding box and zoom range, then packs the
//! tile tree into a tar archive next to a metadata descriptor.

mod args;
mod error;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tilepyramid::log::TracingLogger;
use tilepyramid::logging::init_logging;
use tilepyramid::publisher::TarArchiveExporter;
use tilepyramid::render::{CommandRenderEngine, PlaceholderRenderEngine, RenderEngine};
use tilepyramid::{PyramidOrchestrator, PyramidReport};
use tokio_util::sync::CancellationToken;

use args::Args;
use error::CliError;

/// How long in-flight blocking renders get after the run returns.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        e.exit();
    }
    process::exit(0);
}

fn run(args: Args) -> Result<(), CliError> {
    let _logging_guard = init_logging(args.verbose, args.log_file.as_deref())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let config = args.to_config()?;

    let engine: Arc<dyn RenderEngine> = match &args.render_command {
        Some(program) => Arc::new(CommandRenderEngine::new(program, &args.input)),
        None => Arc::new(PlaceholderRenderEngine::new()),
    };
    tracing::info!(
        engine = engine.name(),
        zoom = %config.zoom,
        workers = config.workers,
        tile_root = %config.tile_root.display(),
        "starting tile pyramid"
    );

    let orchestrator = PyramidOrchestrator::new(
        engine,
        Arc::new(TarArchiveExporter::new()),
        Arc::new(TracingLogger::new("pipeline")),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping workers...");
        signal_token.cancel();
    })
    .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let result = runtime.block_on(orchestrator.run(&config, shutdown));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);

    let report = result?;
    print_summary(&report);

    if report.is_complete() {
        Ok(())
    } else {
        for failure in &report.failures {
            tracing::warn!(
                tile = %failure.tile,
                path = %failure.path.display(),
                "{}",
                failure.message
            );
        }
        Err(CliError::PartialFailure(report.failures.len()))
    }
}

fn print_summary(report: &PyramidReport) {
    tracing::info!(
        zoom = %report.zoom,
        enqueued = report.tiles_enqueued,
        rendered = report.rendered,
        skipped = report.skipped,
        failed = report.failures.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "tile pyramid finished"
    );
    if let Some(archive) = &report.archive {
        tracing::info!(
            path = %archive.path.display(),
            size = archive.size,
            tiles = archive.tile_count,
            sha256 = %archive.checksum,
            "archive written"
        );
    }
}
