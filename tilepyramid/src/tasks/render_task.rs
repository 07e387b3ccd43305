//! Render task type.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::coord::TileCoordinate;

/// One unit of work for the worker pool: render `tile` into `path`.
///
/// Created by the orchestrator, consumed exactly once by a single worker and
/// never mutated afterwards. The label is diagnostic only and shared between
/// all tasks of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTask {
    label: Arc<str>,
    path: PathBuf,
    tile: TileCoordinate,
}

impl RenderTask {
    pub fn new(label: Arc<str>, path: PathBuf, tile: TileCoordinate) -> Self {
        Self { label, path, tile }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Destination file for the rendered image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tile(&self) -> TileCoordinate {
        self.tile
    }
}

impl fmt::Display for RenderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.label, self.tile)
    }
}
