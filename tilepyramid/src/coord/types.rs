//! Coordinate type definitions

use std::fmt;

/// Sphere radius used by spherical (Web) Mercator, in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the side of the Web Mercator square, in metres.
pub const WORLD_EXTENT: f64 = 20_037_508.342_789_244;

/// Lowest zoom level accepted for a pyramid run.
pub const MIN_ZOOM: u8 = 1;

/// Highest zoom level accepted for a pyramid run.
pub const MAX_ZOOM: u8 = 17;

/// Sine clamp applied before the Mercator log, keeps the poles finite.
pub const SIN_LAT_LIMIT: f64 = 0.9999;

/// Axis-aligned box in the projected (EPSG:3857, metres) coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// The full Web Mercator world.
    pub const WORLD: BoundingBox = BoundingBox {
        min_x: -WORLD_EXTENT,
        min_y: -WORLD_EXTENT,
        max_x: WORLD_EXTENT,
        max_y: WORLD_EXTENT,
    };

    /// Creates a bounding box, rejecting empty, inverted or non-finite boxes.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, CoordError> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x >= max_x || min_y >= max_y {
            return Err(CoordError::InvalidBoundingBox {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Top-left corner `(min_x, max_y)`.
    pub fn top_left(&self) -> (f64, f64) {
        (self.min_x, self.max_y)
    }

    /// Bottom-right corner `(max_x, min_y)`.
    pub fn bottom_right(&self) -> (f64, f64) {
        (self.max_x, self.min_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::WORLD
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}, {:.2}, {:.2}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Index of one tile in the XYZ grid.
///
/// Row 0 is the northernmost row and column 0 the westernmost column.
/// Only [`TileEnumerator`](crate::tasks::TileEnumerator) produces these for
/// a run, and only inside `[0, 2^z)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoordinate {
    /// Zoom level
    pub z: u8,
    /// Column, increases eastward
    pub x: u32,
    /// Row, increases southward
    pub y: u32,
}

impl TileCoordinate {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one edge of the grid at zoom `z`.
    #[inline]
    pub fn grid_size(z: u8) -> u64 {
        1u64 << z
    }

    /// Returns true if both indices fall inside the grid for this zoom.
    pub fn is_valid(&self) -> bool {
        let n = Self::grid_size(self.z);
        (self.x as u64) < n && (self.y as u64) < n
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Box is empty, inverted, or has a non-finite edge
    InvalidBoundingBox {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
    /// Zoom level has no entry in the projection table
    ZoomOutOfTable { zoom: u8, levels: usize },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidBoundingBox {
                min_x,
                min_y,
                max_x,
                max_y,
            } => write!(
                f,
                "Invalid bounding box [{}, {}, {}, {}] (need min < max on both axes)",
                min_x, min_y, max_x, max_y
            ),
            CoordError::ZoomOutOfTable { zoom, levels } => write!(
                f,
                "Zoom level {} is outside the projection table ({} levels)",
                zoom, levels
            ),
        }
    }
}

impl std::error::Error for CoordError {}
