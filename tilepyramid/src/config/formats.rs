//! Validated value types for run parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::coord::{MAX_ZOOM, MIN_ZOOM};

/// Inclusive zoom range of a run, both ends on [`MIN_ZOOM`]..=[`MAX_ZOOM`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Result<Self, ConfigError> {
        for zoom in [min, max] {
            if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
                return Err(ConfigError::ZoomOutOfRange {
                    zoom,
                    min: MIN_ZOOM,
                    max: MAX_ZOOM,
                });
            }
        }
        if min > max {
            return Err(ConfigError::ZoomOrder { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Iterates the zoom levels from lowest to highest.
    pub fn levels(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Tile edge length in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileSize {
    Px256,
    #[default]
    Px512,
    Px1024,
}

impl TileSize {
    pub fn pixels(&self) -> u32 {
        match self {
            TileSize::Px256 => 256,
            TileSize::Px512 => 512,
            TileSize::Px1024 => 1024,
        }
    }
}

impl TryFrom<u32> for TileSize {
    type Error = ConfigError;

    fn try_from(pixels: u32) -> Result<Self, Self::Error> {
        match pixels {
            256 => Ok(TileSize::Px256),
            512 => Ok(TileSize::Px512),
            1024 => Ok(TileSize::Px1024),
            other => Err(ConfigError::UnsupportedTileSize(other)),
        }
    }
}

impl FromStr for TileSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pixels = s
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidTileSize(s.to_string()))?;
        TileSize::try_from(pixels)
    }
}

impl fmt::Display for TileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pixels())
    }
}

/// Encoded image format of the rendered tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    Jpg,
    #[default]
    Png,
    Webp,
}

impl TileFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Jpg => "jpg",
            TileFormat::Png => "png",
            TileFormat::Webp => "webp",
        }
    }

    /// Matching encoder format of the `image` crate.
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            TileFormat::Jpg => image::ImageFormat::Jpeg,
            TileFormat::Png => image::ImageFormat::Png,
            TileFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

impl FromStr for TileFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(TileFormat::Jpg),
            "png" => Ok(TileFormat::Png),
            "webp" => Ok(TileFormat::Webp),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Tile addressing scheme recorded in the metadata and passed to the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TilingScheme {
    /// Row 0 at the north edge (slippy map)
    #[default]
    Xyz,
}

impl TilingScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            TilingScheme::Xyz => "xyz",
        }
    }
}

impl FromStr for TilingScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xyz" => Ok(TilingScheme::Xyz),
            _ => Err(ConfigError::UnsupportedScheme(s.to_string())),
        }
    }
}

impl fmt::Display for TilingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
