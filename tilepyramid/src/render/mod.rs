//! Render engine abstraction.
//!
//! The pipeline never produces pixels itself. For each tile it hands a
//! [`RenderRequest`] to a [`RenderEngine`], which writes an image file at the
//! requested destination.
//!
//! # Implementors
//!
//! - [`PlaceholderRenderEngine`] - flat debug tiles drawn with the `image` crate
//! - [`CommandRenderEngine`] - delegates each tile to an external program

mod command;
mod placeholder;

pub use command::CommandRenderEngine;
pub use placeholder::PlaceholderRenderEngine;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::{TileFormat, TileSize};
use crate::coord::BoundingBox;

/// Everything an engine needs to render one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Tile extent in projected metres.
    pub bbox: BoundingBox,
    pub size: TileSize,
    pub format: TileFormat,
    /// File the engine must create.
    pub destination: PathBuf,
}

/// Errors raised by a render engine for a single tile.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode tile: {0}")]
    Encode(String),

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("renderer reported success but {0} was not written")]
    MissingOutput(PathBuf),
}

/// Produces and persists a single tile image.
///
/// Called from blocking worker threads, so implementations must be
/// `Send + Sync` and may block. A returned error is final: the pipeline does
/// not retry.
pub trait RenderEngine: Send + Sync {
    fn render_tile(&self, request: &RenderRequest) -> Result<(), RenderError>;

    /// Short name used in log lines.
    fn name(&self) -> &str;
}
