//! Errors that end a pyramid run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::coord::CoordError;
use crate::executor::{QueueError, RenderFailure};
use crate::publisher::PublishError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The shutdown token was cancelled. Nothing is cleaned up.
    #[error("run aborted by user")]
    UserAbort,

    /// A tile failed under the abort-all policy.
    #[error("{} tile(s) failed to render", .failures.len())]
    RenderFailed { failures: Vec<RenderFailure> },

    #[error("archive already exists at {}", .0.display())]
    ArchiveExists(PathBuf),

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error("export failed: {0}")]
    Publish(PublishError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<PublishError> for PipelineError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::ArchiveExists(path) => PipelineError::ArchiveExists(path),
            other => PipelineError::Publish(other),
        }
    }
}

impl PipelineError {
    /// The first failed tile, if this is a render failure.
    pub fn first_failure(&self) -> Option<&RenderFailure> {
        match self {
            PipelineError::RenderFailed { failures } => failures.first(),
            _ => None,
        }
    }
}
