//! Publishing a finished tile tree.
//!
//! After every tile is rendered the orchestrator writes a metadata
//! descriptor at the tile root and hands the tree to an
//! [`ArchiveExporter`], which packs it into a single distributable file.
//!
//! # Example
//!
//! ```ignore
//! use tilepyramid::publisher::{ArchiveExporter, ExportOptions, TarArchiveExporter};
//!
//! let exporter = TarArchiveExporter::new();
//! let summary = exporter.pack(tile_root, "world.tar.gz".as_ref(), &options)?;
//! println!("{} ({} bytes, sha256 {})", summary.path.display(), summary.size, summary.checksum);
//! ```

mod archive;
mod error;
mod metadata;

pub use archive::{calculate_sha256, TarArchiveExporter};
pub use error::{PublishError, PublishResult};
pub use metadata::{
    metadata_path, read_metadata, write_metadata, TileMetadata, METADATA_FILENAME,
};

use std::path::{Path, PathBuf};

use crate::config::{TileFormat, TilingScheme};

/// Options passed through to the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: TileFormat,
    pub scheme: TilingScheme,
    pub compression: bool,
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,

    /// Archive size in bytes.
    pub size: u64,

    /// SHA-256 of the archive, lowercase hex.
    pub checksum: String,

    /// Tiles of the configured format found in the tree.
    pub tile_count: u64,
}

/// Packs a tile tree into an archive file.
///
/// Implementations must refuse to touch an `archive` path that already
/// exists, returning [`PublishError::ArchiveExists`].
pub trait ArchiveExporter: Send + Sync {
    fn pack(
        &self,
        tile_root: &Path,
        archive: &Path,
        options: &ExportOptions,
    ) -> PublishResult<ArchiveSummary>;

    /// Short name used in log lines.
    fn name(&self) -> &str;
}
