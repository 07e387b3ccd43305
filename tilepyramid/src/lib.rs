//! tilepyramid - parallel raster tile pyramid generation
//!
//! Renders every tile covering a Web Mercator bounding box over a range of
//! zoom levels into a `<z>/<x>/<y>.<ext>` tree, using a bounded queue and a
//! pool of workers, then optionally packs the tree into an archive.
//!
//! # Modules
//!
//! - [`coord`] - Mercator conversions, per-zoom pixel projection, tile bounds
//! - [`tasks`] - tile enumeration and render tasks
//! - [`layout`] - tile tree paths and directory creation
//! - [`executor`] - work queue, workers and failure policy
//! - [`render`] - render engine trait and implementations
//! - [`publisher`] - metadata descriptor and archive export
//! - [`config`] - run parameters
//! - [`orchestrator`] - end-to-end run
//! - [`log`] / [`logging`] - injected logging handle and subscriber setup

pub mod config;
pub mod coord;
pub mod executor;
pub mod layout;
pub mod log;
pub mod logging;
pub mod orchestrator;
pub mod publisher;
pub mod render;
pub mod tasks;

pub use config::PyramidConfig;
pub use orchestrator::{PipelineError, PyramidOrchestrator, PyramidReport};
