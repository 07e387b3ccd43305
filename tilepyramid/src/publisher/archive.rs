//! Archive export of a finished tile tree.
//!
//! Uses the system `tar`, which is standard on Linux and macOS. The archive
//! holds the contents of the tile root (`metadata.json` and `<z>/...`)
//! without a leading directory.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use sha2::{Digest, Sha256};

use super::{ArchiveExporter, ArchiveSummary, ExportOptions, PublishError, PublishResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Packs the tile tree with `tar`, gzip-compressed unless disabled.
#[derive(Debug, Clone)]
pub struct TarArchiveExporter {
    program: PathBuf,
}

impl TarArchiveExporter {
    pub fn new() -> Self {
        Self::with_program("tar")
    }

    /// Uses a specific `tar` binary instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for TarArchiveExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExporter for TarArchiveExporter {
    fn pack(
        &self,
        tile_root: &Path,
        archive: &Path,
        options: &ExportOptions,
    ) -> PublishResult<ArchiveSummary> {
        if archive.exists() {
            return Err(PublishError::ArchiveExists(archive.to_path_buf()));
        }
        if !tile_root.is_dir() {
            return Err(PublishError::InvalidPath(format!(
                "tile root {} is not a directory",
                tile_root.display()
            )));
        }

        let tile_root = absolute(tile_root)?;
        let archive = absolute(archive)?;
        if archive.starts_with(&tile_root) {
            return Err(PublishError::InvalidPath(format!(
                "archive {} must not be inside the tile root",
                archive.display()
            )));
        }
        if let Some(parent) = archive.parent() {
            fs::create_dir_all(parent).map_err(|source| PublishError::CreateDirectoryFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let flag = if options.compression { "-czf" } else { "-cf" };
        let output = Command::new(&self.program)
            .current_dir(&tile_root)
            .arg(flag)
            .arg(&archive)
            .arg(".")
            .output()
            .map_err(|e| {
                PublishError::ArchiveFailed(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            // Nothing existed at this path before the call.
            let _ = fs::remove_file(&archive);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PublishError::ArchiveFailed(format!(
                "tar failed: {}",
                stderr.trim()
            )));
        }

        let size = fs::metadata(&archive)
            .map_err(|source| PublishError::ReadFailed {
                path: archive.clone(),
                source,
            })?
            .len();
        let checksum = calculate_sha256(&archive)?;
        let tile_count = count_tiles(&tile_root, options.format.extension())?;

        Ok(ArchiveSummary {
            path: archive,
            size,
            checksum,
            tile_count,
        })
    }

    fn name(&self) -> &str {
        "tar"
    }
}

/// Calculate the lowercase hex SHA-256 of a file.
pub fn calculate_sha256(path: &Path) -> PublishResult<String> {
    let read_failed = |source| PublishError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_failed)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_failed)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn absolute(path: &Path) -> PublishResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| PublishError::InvalidPath(format!("failed to get cwd: {}", e)))
}

/// Counts files with `extension` anywhere below `dir`.
fn count_tiles(dir: &Path, extension: &str) -> PublishResult<u64> {
    let entries = fs::read_dir(dir).map_err(|source| PublishError::ReadFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut count = 0;
    for entry in entries {
        let path = entry
            .map_err(|source| PublishError::ReadFailed {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.is_dir() {
            count += count_tiles(&path, extension)?;
        } else if path.extension().is_some_and(|e| e == extension) {
            count += 1;
        }
    }
    Ok(count)
}
