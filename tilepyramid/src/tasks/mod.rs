//! Work generation for a pyramid run.
//!
//! - [`TileEnumerator`] - lazily lists the tiles covering a bounding box
//! - [`RenderTask`] - a tile paired with its destination path
//!
//! # Data Flow
//!
//! ```text
//! BoundingBox + zoom ──► TileEnumerator ──► ZoomTiles ──► TileCoordinate
//!                                                             │
//!                            DiskLayout::tile_path ◄──────────┘
//!                                      │
//!                                      ▼
//!                                 RenderTask ──► WorkQueue
//! ```

mod enumerate;
mod render_task;

pub use enumerate::{TileEnumerator, ZoomTiles};
pub use render_task::RenderTask;
