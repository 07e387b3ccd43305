//! Run configuration for a pyramid build.
//!
//! [`PyramidConfig`] gathers everything the orchestrator needs for one run.
//! The CLI builds it from arguments; tests build it directly with the
//! `with_*` helpers.

mod formats;

pub use formats::{TileFormat, TileSize, TilingScheme, ZoomRange};

use std::path::PathBuf;

use thiserror::Error;

use crate::coord::{BoundingBox, CoordError};
use crate::executor::{FailurePolicy, DEFAULT_QUEUE_CAPACITY};

/// Default number of render workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default label attached to render tasks.
pub const DEFAULT_LABEL: &str = "tiles";

/// Invalid run parameters, reported before any work starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("zoom level {zoom} is outside the supported range {min}-{max}")]
    ZoomOutOfRange { zoom: u8, min: u8, max: u8 },

    #[error("minimum zoom {min} is greater than maximum zoom {max}")]
    ZoomOrder { min: u8, max: u8 },

    #[error("tile size {0} is not supported (use 256, 512 or 1024)")]
    UnsupportedTileSize(u32),

    #[error("tile size '{0}' is not a number")]
    InvalidTileSize(String),

    #[error("image format '{0}' is not supported (use jpg, png or webp)")]
    UnsupportedFormat(String),

    #[error("tiling scheme '{0}' is not supported (only xyz)")]
    UnsupportedScheme(String),

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("queue capacity must be at least 1")]
    NoQueueCapacity,

    #[error("invalid bounding box: {0}")]
    BoundingBox(#[from] CoordError),
}

/// Parameters of a single pyramid run.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidConfig {
    /// Area to cover, in projected metres.
    pub bbox: BoundingBox,

    /// Zoom levels to render.
    pub zoom: ZoomRange,

    /// Number of concurrent render workers.
    pub workers: usize,

    /// Root of the `<z>/<x>/<y>.<ext>` tree.
    pub tile_root: PathBuf,

    pub tile_size: TileSize,

    pub format: TileFormat,

    pub scheme: TilingScheme,

    /// Compress the archive when exporting.
    pub compression: bool,

    /// Archive to produce after rendering, if any.
    pub archive: Option<PathBuf>,

    /// Diagnostic label for tasks, also the metadata name.
    pub label: String,

    /// What to do when a tile fails to render.
    pub failure_policy: FailurePolicy,

    /// Bound on queued-but-unclaimed tasks.
    pub queue_capacity: usize,
}

impl PyramidConfig {
    /// Creates a world-extent config with defaults for everything else.
    pub fn new(tile_root: impl Into<PathBuf>, zoom: ZoomRange) -> Self {
        Self {
            bbox: BoundingBox::WORLD,
            zoom,
            workers: DEFAULT_WORKERS,
            tile_root: tile_root.into(),
            tile_size: TileSize::default(),
            format: TileFormat::default(),
            scheme: TilingScheme::default(),
            compression: true,
            archive: None,
            label: DEFAULT_LABEL.to_string(),
            failure_policy: FailurePolicy::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_tile_size(mut self, tile_size: TileSize) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_format(mut self, format: TileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_scheme(mut self, scheme: TilingScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_archive(mut self, archive: impl Into<PathBuf>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Checks the parameters that the constructors cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NoQueueCapacity);
        }
        BoundingBox::new(
            self.bbox.min_x,
            self.bbox.min_y,
            self.bbox.max_x,
            self.bbox.max_y,
        )?;
        ZoomRange::new(self.zoom.min(), self.zoom.max())?;
        Ok(())
    }
}
