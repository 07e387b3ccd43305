//! CLI error handling with user-friendly messages.
//!
//! Centralizes error reporting for the CLI, providing consistent formatting
//! and the documented exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilepyramid::config::ConfigError;
use tilepyramid::PipelineError;

/// Exit status for invalid arguments, matching clap's own usage errors.
pub const EXIT_CONFIG: i32 = 2;

/// Exit status after Ctrl-C, following the 128 + SIGINT shell convention.
pub const EXIT_USER_ABORT: i32 = 130;

/// Exit status for every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Invalid argument value
    Config(ConfigError),
    /// Style input does not exist
    InputMissing(PathBuf),
    /// Failed to install the Ctrl-C handler
    SignalHandler(String),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
    /// The run itself failed
    Pipeline(PipelineError),
    /// The run finished but some tiles failed to render
    PartialFailure(usize),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::InputMissing(_) => EXIT_CONFIG,
            CliError::Pipeline(PipelineError::Config(_)) => EXIT_CONFIG,
            CliError::Pipeline(PipelineError::UserAbort) => EXIT_USER_ABORT,
            _ => EXIT_FAILURE,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Pipeline(PipelineError::ArchiveExists(_)) => {
                eprintln!();
                eprintln!("The existing archive was not modified.");
                eprintln!("Remove it or choose a different output path.");
            }
            CliError::Pipeline(PipelineError::UserAbort) => {
                eprintln!();
                eprintln!("Rendered tiles were left in place; rerun to resume.");
            }
            CliError::Pipeline(err @ PipelineError::RenderFailed { .. }) => {
                if let Some(failure) = err.first_failure() {
                    eprintln!();
                    eprintln!(
                        "First failure: tile {} ({}): {}",
                        failure.tile,
                        failure.path.display(),
                        failure.message
                    );
                    eprintln!("Use --on-error continue to render the remaining tiles.");
                }
            }
            CliError::PartialFailure(_) => {
                eprintln!();
                eprintln!("Failed tiles were not written; rerun to retry only those tiles.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InputMissing(path) => {
                write!(f, "Style input '{}' does not exist", path.display())
            }
            CliError::SignalHandler(msg) => write!(f, "Failed to set signal handler: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Pipeline(e) => write!(f, "{}", e),
            CliError::PartialFailure(count) => write!(f, "{} tile(s) failed to render", count),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}
