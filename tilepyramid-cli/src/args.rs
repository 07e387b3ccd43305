//! Command-line arguments and their conversion into a run config.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tilepyramid::config::{PyramidConfig, TileFormat, TileSize, TilingScheme, ZoomRange};
use tilepyramid::coord::BoundingBox;
use tilepyramid::executor::FailurePolicy;

use crate::error::CliError;

/// Render a raster tile pyramid and package it as an archive.
#[derive(Debug, Parser)]
#[command(name = "tilepyramid", version, about)]
pub struct Args {
    /// Style source handed to the renderer
    pub input: PathBuf,

    /// Archive to create (must not exist)
    pub output: PathBuf,

    /// Lowest zoom level (1-17)
    pub min: u8,

    /// Highest zoom level (1-17)
    pub max: u8,

    /// Area to render in EPSG:3857 metres [default: whole world]
    #[arg(
        long,
        num_args = 4,
        value_names = ["MINX", "MINY", "MAXX", "MAXY"],
        allow_negative_numbers = true
    )]
    pub bbox: Option<Vec<f64>>,

    /// Number of render workers
    #[arg(long, default_value_t = 4)]
    pub cores: usize,

    /// Label for tasks and metadata [default: output file stem]
    #[arg(long)]
    pub name: Option<String>,

    /// Tile edge in pixels (256, 512 or 1024)
    #[arg(long, default_value_t = 512)]
    pub size: u32,

    /// Tile image format
    #[arg(long, value_enum, default_value_t = FormatArg::Png)]
    pub format: FormatArg,

    /// Tiling scheme
    #[arg(long, value_enum, default_value_t = SchemeArg::Xyz)]
    pub scheme: SchemeArg,

    /// Store the archive without compression
    #[arg(long = "no_compression", visible_alias = "no-compression")]
    pub no_compression: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Tile tree root [default: <output dir>/<output stem>_tiles]
    #[arg(long)]
    pub tile_dir: Option<PathBuf>,

    /// External renderer invoked once per tile
    #[arg(long)]
    pub render_command: Option<PathBuf>,

    /// What to do when a tile fails to render
    #[arg(long, value_enum, default_value_t = OnErrorArg::Abort)]
    pub on_error: OnErrorArg,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Tile image format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FormatArg {
    #[value(alias = "jpeg")]
    Jpg,
    Png,
    Webp,
}

impl From<FormatArg> for TileFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Jpg => TileFormat::Jpg,
            FormatArg::Png => TileFormat::Png,
            FormatArg::Webp => TileFormat::Webp,
        }
    }
}

/// Tiling scheme selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SchemeArg {
    /// Slippy-map rows, 0 at the north edge
    Xyz,
}

impl From<SchemeArg> for TilingScheme {
    fn from(scheme: SchemeArg) -> Self {
        match scheme {
            SchemeArg::Xyz => TilingScheme::Xyz,
        }
    }
}

/// Failure policy selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OnErrorArg {
    /// Stop the whole run at the first failed tile
    Abort,
    /// Keep rendering and report failed tiles at the end
    Continue,
}

impl From<OnErrorArg> for FailurePolicy {
    fn from(policy: OnErrorArg) -> Self {
        match policy {
            OnErrorArg::Abort => FailurePolicy::AbortAll,
            OnErrorArg::Continue => FailurePolicy::ContinueOnError,
        }
    }
}

impl Args {
    /// Builds the run config, rejecting invalid values before any work starts.
    pub fn to_config(&self) -> Result<PyramidConfig, CliError> {
        if !self.input.exists() {
            return Err(CliError::InputMissing(self.input.clone()));
        }

        let zoom = ZoomRange::new(self.min, self.max)?;
        let tile_size = TileSize::try_from(self.size)?;
        let stem = archive_stem(&self.output);
        let tile_root = self
            .tile_dir
            .clone()
            .unwrap_or_else(|| default_tile_dir(&self.output, &stem));

        let mut config = PyramidConfig::new(tile_root, zoom)
            .with_workers(self.cores)
            .with_tile_size(tile_size)
            .with_format(self.format.into())
            .with_scheme(self.scheme.into())
            .with_compression(!self.no_compression)
            .with_archive(&self.output)
            .with_label(self.name.clone().unwrap_or(stem))
            .with_failure_policy(self.on_error.into());

        if let Some(values) = &self.bbox {
            if let [min_x, min_y, max_x, max_y] = values[..] {
                let bbox = BoundingBox::new(min_x, min_y, max_x, max_y)
                    .map_err(tilepyramid::config::ConfigError::from)?;
                config = config.with_bbox(bbox);
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// File name of `output` without archive extensions.
fn archive_stem(output: &Path) -> String {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tiles".to_string());
    for suffix in [".tar.gz", ".tgz", ".tar"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name)
}

fn default_tile_dir(output: &Path, stem: &str) -> PathBuf {
    let dir = output.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{}_tiles", stem))
}
