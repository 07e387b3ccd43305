//! Render engine that shells out to an external program.
//!
//! The program is invoked once per tile as:
//!
//! ```text
//! <program> <style> <min_x> <min_y> <max_x> <max_y> <size> <format> <destination>
//! ```
//!
//! and must write the image to `<destination>` before exiting with status 0.

use std::path::PathBuf;
use std::process::Command;

use super::{RenderEngine, RenderError, RenderRequest};

/// Delegates rendering to an external command.
#[derive(Debug, Clone)]
pub struct CommandRenderEngine {
    program: PathBuf,
    style: PathBuf,
}

impl CommandRenderEngine {
    pub fn new(program: impl Into<PathBuf>, style: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            style: style.into(),
        }
    }

    fn arguments(&self, request: &RenderRequest) -> Vec<String> {
        let bbox = &request.bbox;
        vec![
            self.style.display().to_string(),
            bbox.min_x.to_string(),
            bbox.min_y.to_string(),
            bbox.max_x.to_string(),
            bbox.max_y.to_string(),
            request.size.to_string(),
            request.format.to_string(),
            request.destination.display().to_string(),
        ]
    }
}

impl RenderEngine for CommandRenderEngine {
    fn render_tile(&self, request: &RenderRequest) -> Result<(), RenderError> {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(self.arguments(request))
            .output()
            .map_err(|source| RenderError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RenderError::CommandFailed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !request.destination.exists() {
            return Err(RenderError::MissingOutput(request.destination.clone()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "command"
    }
}
