//! Coordinate conversion module
//!
//! Converts between projected Web Mercator metres, geographic degrees and the
//! per-zoom pixel space used to address tiles. The pixel transform is driven
//! by a [`ProjectionTable`] built once per run and shared read-only by every
//! worker.

mod types;

pub use types::{
    BoundingBox, CoordError, TileCoordinate, EARTH_RADIUS, MAX_ZOOM, MIN_ZOOM, SIN_LAT_LIMIT,
    WORLD_EXTENT,
};

use std::f64::consts::PI;

/// Converts projected Mercator metres to longitude/latitude in degrees.
#[inline]
pub fn mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Converts longitude/latitude in degrees to projected Mercator metres.
#[inline]
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

/// Scale constants for one zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomScale {
    /// Pixels per degree of longitude
    pub pixels_per_degree: f64,
    /// Pixels per radian of Mercator northing
    pub pixels_per_radian: f64,
    /// Pixel offset of the world origin, applied to both axes
    pub center_offset: f64,
    /// Edge of the whole world in pixels at this zoom
    pub edge_pixels: f64,
}

impl ZoomScale {
    fn new(zoom: u8, tile_size: u32) -> Self {
        let edge_pixels = tile_size as f64 * 2.0_f64.powi(zoom as i32);
        Self {
            pixels_per_degree: edge_pixels / 360.0,
            pixels_per_radian: edge_pixels / (2.0 * PI),
            center_offset: edge_pixels / 2.0,
            edge_pixels,
        }
    }
}

/// Precomputed per-zoom projection constants.
///
/// Built once for the highest zoom of a run; lower zooms index into the same
/// table. The table is immutable after construction, so it can be shared
/// across worker threads behind an `Arc` without locking.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionTable {
    tile_size: u32,
    scales: Vec<ZoomScale>,
}

impl ProjectionTable {
    /// Builds `levels` entries, one for each zoom `0..levels`.
    pub fn build(levels: u8, tile_size: u32) -> Self {
        let scales = (0..levels).map(|z| ZoomScale::new(z, tile_size)).collect();
        Self { tile_size, scales }
    }

    /// Tile edge length in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of zoom levels in the table.
    pub fn levels(&self) -> usize {
        self.scales.len()
    }

    /// Returns the scale constants for `zoom`.
    pub fn scale(&self, zoom: u8) -> Result<&ZoomScale, CoordError> {
        self.scales
            .get(zoom as usize)
            .ok_or(CoordError::ZoomOutOfTable {
                zoom,
                levels: self.scales.len(),
            })
    }

    /// Projects longitude/latitude to pixel coordinates at `zoom`.
    ///
    /// Both values are rounded to the nearest whole pixel. The sine of the
    /// latitude is clamped to ±[`SIN_LAT_LIMIT`] so the poles stay finite.
    pub fn to_pixel(&self, lon: f64, lat: f64, zoom: u8) -> Result<(f64, f64), CoordError> {
        let scale = self.scale(zoom)?;
        let px = scale.center_offset + lon * scale.pixels_per_degree;
        let s = lat.to_radians().sin().clamp(-SIN_LAT_LIMIT, SIN_LAT_LIMIT);
        let py = scale.center_offset + 0.5 * ((1.0 + s) / (1.0 - s)).ln() * -scale.pixels_per_radian;
        Ok((px.round(), py.round()))
    }

    /// Inverse of [`to_pixel`](Self::to_pixel), without rounding.
    pub fn to_lon_lat(&self, px: f64, py: f64, zoom: u8) -> Result<(f64, f64), CoordError> {
        let scale = self.scale(zoom)?;
        let lon = (px - scale.center_offset) / scale.pixels_per_degree;
        let g = (py - scale.center_offset) / -scale.pixels_per_radian;
        let lat = (2.0 * g.exp().atan() - 0.5 * PI).to_degrees();
        Ok((lon, lat))
    }

    /// Returns the projected (metre) extent of a tile.
    ///
    /// The box runs from the tile's bottom-left pixel to its top-right pixel,
    /// so `min_y` comes from row `y + 1`.
    pub fn tile_bounds(&self, tile: &TileCoordinate) -> Result<BoundingBox, CoordError> {
        let ts = self.tile_size as f64;
        let (x, y) = (tile.x as f64, tile.y as f64);

        let (lon0, lat0) = self.to_lon_lat(x * ts, (y + 1.0) * ts, tile.z)?;
        let (lon1, lat1) = self.to_lon_lat((x + 1.0) * ts, y * ts, tile.z)?;

        let (min_x, min_y) = lon_lat_to_mercator(lon0, lat0);
        let (max_x, max_y) = lon_lat_to_mercator(lon1, lat1);
        BoundingBox::new(min_x, min_y, max_x, max_y)
    }
}
