//! Error types for the publisher module.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for publisher operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors raised while writing metadata or packing the archive.
#[derive(Debug)]
pub enum PublishError {
    /// The archive path is already taken. The existing file is left alone.
    ArchiveExists(PathBuf),

    /// Failed to create directory.
    CreateDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// The metadata file exists but is not valid.
    InvalidMetadata { path: PathBuf, message: String },

    /// Invalid path provided.
    InvalidPath(String),

    /// The archive tool failed or could not be started.
    ArchiveFailed(String),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::ArchiveExists(path) => {
                write!(f, "archive already exists at {}", path.display())
            }
            PublishError::CreateDirectoryFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            PublishError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            PublishError::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            PublishError::InvalidMetadata { path, message } => {
                write!(f, "invalid metadata in {}: {}", path.display(), message)
            }
            PublishError::InvalidPath(msg) => {
                write!(f, "invalid path: {}", msg)
            }
            PublishError::ArchiveFailed(msg) => {
                write!(f, "archive failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::CreateDirectoryFailed { source, .. } => Some(source),
            PublishError::ReadFailed { source, .. } => Some(source),
            PublishError::WriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
