//! On-disk layout of the tile tree.
//!
//! Tiles live at `<root>/<z>/<x>/<y>.<ext>` with `metadata.json` at the root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::TileFormat;
use crate::coord::TileCoordinate;
use crate::publisher;

/// Path policy and directory management for a tile tree.
#[derive(Debug, Clone)]
pub struct DiskLayout {
    root: PathBuf,
    format: TileFormat,
}

impl DiskLayout {
    pub fn new(root: impl Into<PathBuf>, format: TileFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn zoom_dir(&self, z: u8) -> PathBuf {
        self.root.join(z.to_string())
    }

    pub fn column_dir(&self, z: u8, x: u32) -> PathBuf {
        self.zoom_dir(z).join(x.to_string())
    }

    /// Destination of a rendered tile.
    pub fn tile_path(&self, tile: &TileCoordinate) -> PathBuf {
        self.column_dir(tile.z, tile.x)
            .join(format!("{}.{}", tile.y, self.format.extension()))
    }

    pub fn metadata_path(&self) -> PathBuf {
        publisher::metadata_path(&self.root)
    }

    /// Creates `path` and its ancestors if absent.
    ///
    /// A no-op for an existing directory. Fails with
    /// [`io::ErrorKind::AlreadyExists`] if `path` is a file.
    pub fn ensure_dir(path: &Path) -> io::Result<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", path.display()),
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(path),
            Err(e) => Err(e),
        }
    }

    /// Whether something already exists at `path`.
    ///
    /// Contents are not inspected; a present file counts as rendered.
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
}
