//! Tile enumeration for a bounding box.
//!
//! [`TileEnumerator`] turns a projected bounding box into the exact set of
//! tiles that cover it at each zoom level. Enumeration is lazy: each zoom
//! yields a [`ZoomTiles`] iterator holding only its index ranges, so a
//! world-extent zoom 17 level costs nothing until it is walked.
//!
//! # Algorithm
//!
//! For zoom `z`:
//!
//! 1. Convert the box's top-left `(min_x, max_y)` and bottom-right
//!    `(max_x, min_y)` corners to longitude/latitude.
//! 2. Project both corners to pixel space at `z`.
//! 3. Divide by the tile edge and floor to get inclusive index ranges.
//! 4. Intersect both ranges with `[0, 2^z)`.
//!
//! ```text
//!  (min_x, max_y)
//!        ┌───────┬───────┬───────┐
//!        │ x0,y0 │       │ x1,y0 │
//!        ├───────┼───────┼───────┤
//!        │ x0,y1 │       │ x1,y1 │
//!        └───────┴───────┴───────┘
//!                          (max_x, min_y)
//! ```
//!
//! Tiles are emitted column-major: increasing `x`, then increasing `y`,
//! inside increasing `z`.

use std::ops::RangeInclusive;

use crate::coord::{mercator_to_lon_lat, BoundingBox, CoordError, ProjectionTable, TileCoordinate};

/// Enumerates the tiles covering a bounding box.
#[derive(Debug, Clone, Copy)]
pub struct TileEnumerator<'a> {
    bbox: BoundingBox,
    projection: &'a ProjectionTable,
}

impl<'a> TileEnumerator<'a> {
    /// Creates an enumerator over `bbox` using the given projection table.
    ///
    /// The tile edge length comes from the table.
    pub fn new(bbox: BoundingBox, projection: &'a ProjectionTable) -> Self {
        Self { bbox, projection }
    }

    /// Returns the tiles covering the box at a single zoom level.
    pub fn zoom(&self, z: u8) -> Result<ZoomTiles, CoordError> {
        let tile_size = self.projection.tile_size() as f64;

        let (left, top) = self.bbox.top_left();
        let (right, bottom) = self.bbox.bottom_right();
        let (lon0, lat0) = mercator_to_lon_lat(left, top);
        let (lon1, lat1) = mercator_to_lon_lat(right, bottom);

        let (px0, py0) = self.projection.to_pixel(lon0, lat0, z)?;
        let (px1, py1) = self.projection.to_pixel(lon1, lat1, z)?;

        let columns = clip_range(
            (px0 / tile_size).floor() as i64,
            (px1 / tile_size).floor() as i64,
            z,
        );
        let rows = clip_range(
            (py0 / tile_size).floor() as i64,
            (py1 / tile_size).floor() as i64,
            z,
        );

        Ok(ZoomTiles::new(z, columns, rows))
    }

    /// Returns every covering tile for zooms `min_zoom..=max_zoom` in order.
    pub fn tiles(
        &self,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Result<impl Iterator<Item = TileCoordinate>, CoordError> {
        let levels = (min_zoom..=max_zoom)
            .map(|z| self.zoom(z))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(levels.into_iter().flatten())
    }
}

/// Intersects an inclusive index range with the grid `[0, 2^z)`.
fn clip_range(start: i64, end: i64, z: u8) -> Option<RangeInclusive<u32>> {
    let last = (TileCoordinate::grid_size(z) - 1) as i64;
    let start = start.max(0);
    let end = end.min(last);
    if start > end {
        return None;
    }
    Some(start as u32..=end as u32)
}

/// Lazy iterator over the tiles of one zoom level.
///
/// Yields `(x, y)` pairs in column-major order over two clipped inclusive
/// ranges. An empty range on either axis yields nothing.
#[derive(Debug, Clone)]
pub struct ZoomTiles {
    zoom: u8,
    columns: Option<RangeInclusive<u32>>,
    rows: Option<RangeInclusive<u32>>,
    next_x: u64,
    next_y: u64,
}

impl ZoomTiles {
    fn new(zoom: u8, columns: Option<RangeInclusive<u32>>, rows: Option<RangeInclusive<u32>>) -> Self {
        let next_x = columns.as_ref().map_or(0, |c| *c.start() as u64);
        let next_y = rows.as_ref().map_or(0, |r| *r.start() as u64);
        Self {
            zoom,
            columns,
            rows,
            next_x,
            next_y,
        }
    }

    /// Zoom level this iterator covers.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Inclusive column range, or `None` if the box misses the grid.
    pub fn columns(&self) -> Option<&RangeInclusive<u32>> {
        self.columns.as_ref()
    }

    /// Inclusive row range, or `None` if the box misses the grid.
    pub fn rows(&self) -> Option<&RangeInclusive<u32>> {
        self.rows.as_ref()
    }

    fn remaining(&self) -> u64 {
        let (Some(columns), Some(rows)) = (&self.columns, &self.rows) else {
            return 0;
        };
        let (x_end, y_start, y_end) = (
            *columns.end() as u64,
            *rows.start() as u64,
            *rows.end() as u64,
        );
        if self.next_x > x_end {
            return 0;
        }
        let height = y_end - y_start + 1;
        let in_current_column = y_end + 1 - self.next_y;
        let later_columns = x_end - self.next_x;
        in_current_column + later_columns * height
    }
}

impl Iterator for ZoomTiles {
    type Item = TileCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        let (columns, rows) = (self.columns.as_ref()?, self.rows.as_ref()?);
        if self.next_x > *columns.end() as u64 {
            return None;
        }

        let tile = TileCoordinate::new(self.zoom, self.next_x as u32, self.next_y as u32);

        if self.next_y >= *rows.end() as u64 {
            self.next_y = *rows.start() as u64;
            self.next_x += 1;
        } else {
            self.next_y += 1;
        }

        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining() as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ZoomTiles {
    fn len(&self) -> usize {
        self.remaining() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::lon_lat_to_mercator;
    use std::collections::HashSet;

    fn world_table() -> ProjectionTable {
        ProjectionTable::build(18, 256)
    }

    /// Shrinks a tile's extent inward so it lies strictly inside the tile.
    fn inset_tile_bbox(table: &ProjectionTable, tile: &TileCoordinate) -> BoundingBox {
        let bounds = table.tile_bounds(tile).unwrap();
        let dx = bounds.width() * 0.1;
        let dy = bounds.height() * 0.1;
        BoundingBox::new(
            bounds.min_x + dx,
            bounds.min_y + dy,
            bounds.max_x - dx,
            bounds.max_y - dy,
        )
        .unwrap()
    }

    #[test]
    fn test_world_zoom_one_yields_four_tiles_in_order() {
        let table = world_table();
        let tiles: Vec<_> = TileEnumerator::new(BoundingBox::WORLD, &table)
            .zoom(1)
            .unwrap()
            .collect();

        assert_eq!(
            tiles,
            vec![
                TileCoordinate::new(1, 0, 0),
                TileCoordinate::new(1, 0, 1),
                TileCoordinate::new(1, 1, 0),
                TileCoordinate::new(1, 1, 1),
            ]
        );
    }

    #[test]
    fn test_box_inside_single_tile_yields_that_tile() {
        let table = world_table();
        let target = TileCoordinate::new(3, 1, 1);
        let bbox = inset_tile_bbox(&table, &target);

        let tiles: Vec<_> = TileEnumerator::new(bbox, &table).zoom(3).unwrap().collect();
        assert_eq!(tiles, vec![target]);
    }

    #[test]
    fn test_world_zoom_zero_is_single_tile() {
        let table = world_table();
        let tiles: Vec<_> = TileEnumerator::new(BoundingBox::WORLD, &table)
            .zoom(0)
            .unwrap()
            .collect();
        assert_eq!(tiles, vec![TileCoordinate::new(0, 0, 0)]);
    }

    #[test]
    fn test_world_zoom_seventeen_reports_full_count_lazily() {
        let table = world_table();
        let level = TileEnumerator::new(BoundingBox::WORLD, &table)
            .zoom(17)
            .unwrap();

        assert_eq!(level.len(), 1usize << 34);
        assert_eq!(level.columns(), Some(&(0..=131_071)));
        assert_eq!(level.rows(), Some(&(0..=131_071)));
    }

    #[test]
    fn test_tiles_across_zooms_are_ordered_by_zoom() {
        let table = world_table();
        let tiles: Vec<_> = TileEnumerator::new(BoundingBox::WORLD, &table)
            .tiles(1, 3)
            .unwrap()
            .collect();

        assert_eq!(tiles.len(), 4 + 16 + 64);
        let zooms: Vec<u8> = tiles.iter().map(|t| t.z).collect();
        let mut sorted = zooms.clone();
        sorted.sort();
        assert_eq!(zooms, sorted);
    }

    #[test]
    fn test_tiles_rejects_zoom_outside_table() {
        let table = ProjectionTable::build(3, 256);
        let enumerator = TileEnumerator::new(BoundingBox::WORLD, &table);
        assert!(enumerator.tiles(1, 5).is_err());
    }

    #[test]
    fn test_box_straddling_column_boundary() {
        let table = world_table();
        // A thin box across the prime meridian near the equator, zoom 2.
        let (west, south) = lon_lat_to_mercator(-10.0, -5.0);
        let (east, north) = lon_lat_to_mercator(10.0, 5.0);
        let bbox = BoundingBox::new(west, south, east, north).unwrap();

        let tiles: Vec<_> = TileEnumerator::new(bbox, &table).zoom(2).unwrap().collect();
        assert_eq!(
            tiles,
            vec![
                TileCoordinate::new(2, 1, 1),
                TileCoordinate::new(2, 1, 2),
                TileCoordinate::new(2, 2, 1),
                TileCoordinate::new(2, 2, 2),
            ]
        );
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let table = world_table();
        let mut level = TileEnumerator::new(BoundingBox::WORLD, &table)
            .zoom(2)
            .unwrap();

        assert_eq!(level.len(), 16);
        level.next();
        level.next();
        assert_eq!(level.len(), 14);
        let rest: Vec<_> = level.by_ref().collect();
        assert_eq!(rest.len(), 14);
        assert_eq!(level.len(), 0);
        assert!(level.next().is_none());
    }

    #[test]
    fn test_clip_range_outside_grid_is_empty() {
        assert_eq!(clip_range(4, 9, 2), None);
        assert_eq!(clip_range(-3, -1, 2), None);
        assert_eq!(clip_range(-3, 9, 2), Some(0..=3));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_world_coverage_is_complete(zoom in 0u8..=6) {
                let table = world_table();
                let tiles: Vec<_> = TileEnumerator::new(BoundingBox::WORLD, &table)
                    .zoom(zoom)?
                    .collect();

                let n = 1usize << zoom;
                prop_assert_eq!(tiles.len(), n * n);
                let unique: HashSet<_> = tiles.iter().collect();
                prop_assert_eq!(unique.len(), n * n);
            }

            #[test]
            fn test_emitted_tiles_are_valid_and_unique(
                lon0 in -180.0..180.0_f64,
                lon1 in -180.0..180.0_f64,
                lat0 in -85.0..85.0_f64,
                lat1 in -85.0..85.0_f64,
                zoom in 0u8..=8
            ) {
                prop_assume!((lon0 - lon1).abs() > 1e-6 && (lat0 - lat1).abs() > 1e-6);
                let (x0, y0) = lon_lat_to_mercator(lon0.min(lon1), lat0.min(lat1));
                let (x1, y1) = lon_lat_to_mercator(lon0.max(lon1), lat0.max(lat1));
                let bbox = BoundingBox::new(x0, y0, x1, y1)?;

                let table = world_table();
                let level = TileEnumerator::new(bbox, &table).zoom(zoom)?;
                let expected = level.len();
                let tiles: Vec<_> = level.collect();

                prop_assert_eq!(tiles.len(), expected);
                let unique: HashSet<_> = tiles.iter().collect();
                prop_assert_eq!(unique.len(), tiles.len());
                for tile in &tiles {
                    prop_assert!(tile.is_valid(), "{} outside grid", tile);
                    prop_assert_eq!(tile.z, zoom);
                }
            }

            #[test]
            fn test_world_count_matches_grid(zoom in 0u8..=17) {
                let table = world_table();
                let level = TileEnumerator::new(BoundingBox::WORLD, &table).zoom(zoom)?;
                let n = 1usize << zoom;
                prop_assert_eq!(level.len(), n * n);
            }
        }
    }
}
