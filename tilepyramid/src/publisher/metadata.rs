//! Tile tree metadata descriptor.
//!
//! `metadata.json` sits at the root of the tile tree and is packed into the
//! archive with the tiles. Zoom levels are stored as strings, matching what
//! MBTiles-style readers expect.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{PublishError, PublishResult};
use crate::config::{TileFormat, TilingScheme, ZoomRange};
use crate::coord::{mercator_to_lon_lat, BoundingBox};

/// Name of the metadata file at the tile root.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMetadata {
    pub name: String,
    pub format: TileFormat,
    pub scheme: TilingScheme,
    pub minzoom: String,
    pub maxzoom: String,
    /// `west,south,east,north` in degrees.
    pub bounds: String,
}

impl TileMetadata {
    pub fn new(
        name: impl Into<String>,
        format: TileFormat,
        scheme: TilingScheme,
        zoom: ZoomRange,
        bbox: &BoundingBox,
    ) -> Self {
        let (west, south) = mercator_to_lon_lat(bbox.min_x, bbox.min_y);
        let (east, north) = mercator_to_lon_lat(bbox.max_x, bbox.max_y);
        Self {
            name: name.into(),
            format,
            scheme,
            minzoom: zoom.min().to_string(),
            maxzoom: zoom.max().to_string(),
            bounds: format!("{:.6},{:.6},{:.6},{:.6}", west, south, east, north),
        }
    }
}

/// Path of the metadata file under `tile_root`.
pub fn metadata_path(tile_root: &Path) -> PathBuf {
    tile_root.join(METADATA_FILENAME)
}

/// Writes `metadata.json`, replacing any previous copy.
pub fn write_metadata(tile_root: &Path, metadata: &TileMetadata) -> PublishResult<PathBuf> {
    let path = metadata_path(tile_root);
    let json = serde_json::to_string_pretty(metadata).map_err(|e| PublishError::InvalidMetadata {
        path: path.clone(),
        message: e.to_string(),
    })?;
    fs::write(&path, json).map_err(|source| PublishError::WriteFailed {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

pub fn read_metadata(tile_root: &Path) -> PublishResult<TileMetadata> {
    let path = metadata_path(tile_root);
    let content = fs::read_to_string(&path).map_err(|source| PublishError::ReadFailed {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| PublishError::InvalidMetadata {
        path,
        message: e.to_string(),
    })
}
