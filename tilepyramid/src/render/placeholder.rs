//! Placeholder renderer producing flat, bordered tiles.

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

use super::{RenderEngine, RenderError, RenderRequest};
use crate::coord::{BoundingBox, WORLD_EXTENT};

const BORDER: Rgb<u8> = Rgb([40, 40, 40]);

/// Draws a solid tile with a one-pixel border.
///
/// The fill colour follows the tile centre, so adjacent tiles are easy to
/// tell apart when the pyramid is viewed in a slippy map.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderRenderEngine;

impl PlaceholderRenderEngine {
    pub fn new() -> Self {
        Self
    }

    fn fill_colour(bbox: &BoundingBox) -> Rgb<u8> {
        let channel = |v: f64| (((v / WORLD_EXTENT) + 1.0) * 127.5).clamp(0.0, 255.0) as u8;
        let cx = (bbox.min_x + bbox.max_x) / 2.0;
        let cy = (bbox.min_y + bbox.max_y) / 2.0;
        // Smaller tiles get a lighter blue channel.
        let blue = (255.0 - (bbox.width() / (2.0 * WORLD_EXTENT)).log2().abs() * 12.0)
            .clamp(64.0, 255.0) as u8;
        Rgb([channel(cx), channel(cy), blue])
    }

    fn draw(size: u32, fill: Rgb<u8>) -> RgbImage {
        let last = size.saturating_sub(1);
        RgbImage::from_fn(size, size, |x, y| {
            if x == 0 || y == 0 || x == last || y == last {
                BORDER
            } else {
                fill
            }
        })
    }
}

impl RenderEngine for PlaceholderRenderEngine {
    fn render_tile(&self, request: &RenderRequest) -> Result<(), RenderError> {
        let image = Self::draw(request.size.pixels(), Self::fill_colour(&request.bbox));

        // Encode next to the target and rename, so an interrupted write never
        // leaves a file the next run would mistake for a finished tile.
        let partial = partial_path(&request.destination);
        image
            .save_with_format(&partial, request.format.image_format())
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        fs::rename(&partial, &request.destination).map_err(|source| RenderError::Io {
            path: request.destination.clone(),
            source,
        })
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}

fn partial_path(destination: &Path) -> std::path::PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}
